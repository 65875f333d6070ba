// src/data_analysis/mod.rs

pub mod calc_step_response;
pub mod derivative;
pub mod fft_utils;
pub mod flight_modes;
pub mod map_projection;
pub mod resample;
pub mod spectral_analysis;
