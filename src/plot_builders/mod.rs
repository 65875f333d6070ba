// src/plot_builders/mod.rs

pub mod data_plot;
pub mod data_plot_2d;
pub mod data_plot_fft;
pub mod data_plot_spec;
pub mod overlays;

use crate::plot_framework::ChartDescriptor;

/// Common surface of the chart builders, used by the page code to collect
/// finished charts and the reasons for skipped ones.
pub trait ChartBuilder {
    fn chart_title(&self) -> &str;
    fn error_messages(&self) -> &[String];
    fn into_chart(self) -> Option<ChartDescriptor>;
}

macro_rules! impl_chart_builder {
    ($($builder:ident),*) => {
        $(
            impl ChartBuilder for $builder<'_> {
                fn chart_title(&self) -> &str {
                    &self.state.chart.title
                }

                fn error_messages(&self) -> &[String] {
                    &self.state.errors
                }

                fn into_chart(self) -> Option<ChartDescriptor> {
                    self.finalize()
                }
            }
        )*
    };
}

use data_plot::DataPlot;
use data_plot_2d::DataPlot2D;
use data_plot_fft::DataPlotFft;
use data_plot_spec::DataPlotSpec;

impl_chart_builder!(DataPlot, DataPlot2D, DataPlotFft, DataPlotSpec);
