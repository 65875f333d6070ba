// src/data_input/mod.rs

pub mod flight_log;
pub mod log_parser;
