// src/page_builder.rs

use tracing::{debug, info};

use crate::config::PlotConfig;
use crate::data_input::flight_log::FlightLog;
use crate::leaflet::ulog_to_polyline;
use crate::page::Page;
use crate::plot_functions::plot_attitude::plot_attitude;
use crate::plot_functions::plot_inputs::{plot_actuators, plot_manual_control};
use crate::plot_functions::plot_pid_analysis::plot_pid_analysis;
use crate::plot_functions::plot_position::{
    plot_airspeed, plot_altitude, plot_local_position, plot_local_position_2d, plot_velocity, plot_visual_odometry,
};
use crate::plot_functions::plot_sensors::plot_sensors;
use crate::plot_functions::plot_system::{
    plot_cpu, plot_estimator_watchdog, plot_power, plot_rc_quality, plot_sampling_regularity,
};
use crate::plot_functions::PlotContext;
use crate::plotted_tables::{
    get_additional_info_html, get_changed_parameters, get_corrupt_log_html, get_error_labels_html,
    get_hardfault_html, get_heading_html, get_info_table_html, get_logged_messages,
};

pub const MAIN_PAGE_TITLE: &str = "Flight Review";
pub const PID_ANALYSIS_PAGE_TITLE: &str = "PID Analysis";

const PID_ANALYSIS_INTRO_HTML: &str = "<p>This page shows step response plots for the PID controller. \
The step response is an objective measure to evaluate the performance of a PID controller, i.e. if \
the tuning gains are appropriate. In particular, the following metrics can be read from the plots: \
response time, overshoot and settling time.</p>\n<p>The step response plots are based on \
<a href=\"https://github.com/Plasmatree/PID-Analyzer\">PID-Analyzer</a>, and are derived from the \
actual rate setpoint and the measured rates. A quick tuning check needs enough excitation around \
all axes, ideally with sharp stick inputs.</p>\n";

/// Builds the main flight review page.
pub fn generate_plots(log: &FlightLog, config: &PlotConfig) -> Page {
    let mut page = Page::new(MAIN_PAGE_TITLE);
    let mut ctx = PlotContext::new(log, config);

    page.template.title_html = get_heading_html(log, MAIN_PAGE_TITLE, &[]);
    page.template.info_table_html = get_info_table_html(log, ctx.vtol_states.as_deref());
    page.template.hardfault_html = get_hardfault_html(log);
    page.template.corrupt_log_html = get_corrupt_log_html(log);

    if plot_local_position_2d(&mut ctx) {
        page.template.has_position_data = true;
        match ulog_to_polyline(log, &ctx.flight_modes) {
            Ok((pos_datas, pos_flight_modes)) => {
                page.template.pos_datas = pos_datas;
                page.template.pos_flight_modes = pos_flight_modes;
            }
            Err(e) => debug!("No map polyline: {}", e),
        }
    }

    plot_altitude(&mut ctx);
    plot_attitude(&mut ctx);
    plot_local_position(&mut ctx);
    plot_velocity(&mut ctx);
    plot_visual_odometry(&mut ctx);
    plot_airspeed(&mut ctx);
    plot_manual_control(&mut ctx);
    plot_actuators(&mut ctx);
    plot_sensors(&mut ctx);
    plot_power(&mut ctx);
    plot_estimator_watchdog(&mut ctx);
    plot_rc_quality(&mut ctx);
    plot_cpu(&mut ctx);
    plot_sampling_regularity(&mut ctx);

    info!("{} charts, {} skipped", ctx.charts.len(), ctx.skipped.len());
    page.template.error_labels_html = get_error_labels_html(&ctx.skipped);
    for chart in ctx.charts {
        page.push_chart(chart);
    }

    page.push_html(get_changed_parameters(log));
    page.push_html(get_logged_messages(log));
    page.template.additional_info = get_additional_info_html(log);
    page.build_navigation();
    page
}

/// Builds the PID analysis page: rate charts and step responses per axis.
pub fn get_pid_analysis_plots(log: &FlightLog, config: &PlotConfig) -> Page {
    let mut page = Page::new(PID_ANALYSIS_PAGE_TITLE);
    let mut ctx = PlotContext::new(log, config);

    page.template.title_html = get_heading_html(log, PID_ANALYSIS_PAGE_TITLE, &[]) + PID_ANALYSIS_INTRO_HTML;
    page.template.info_table_html = get_info_table_html(log, ctx.vtol_states.as_deref());

    let error_panel = plot_pid_analysis(&mut ctx);
    info!("{} PID analysis charts", ctx.charts.len());
    page.template.error_labels_html = get_error_labels_html(&ctx.skipped);
    for chart in ctx.charts {
        page.push_chart(chart);
    }
    if let Some(panel) = error_panel {
        page.insert_html(0, panel.to_string());
    }
    page.build_navigation();
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_log::Dataset;
    use crate::page::PageItem;
    use crate::plot_functions::plot_pid_analysis::MISSING_TOPICS_HTML;

    fn cpu_log() -> FlightLog {
        let mut d = Dataset::new("cpuload", 0);
        d.data.insert("timestamp".into(), vec![0.0, 1e6, 2e6]);
        d.data.insert("load".into(), vec![0.2, 0.4, 0.3]);
        d.data.insert("ram_usage".into(), vec![0.5, 0.5, 0.5]);
        FlightLog::new("cpu_only", vec![d])
    }

    #[test]
    fn test_main_page_with_single_topic() {
        let log = cpu_log();
        let page = generate_plots(&log, &PlotConfig::default());
        let titles: Vec<&str> = page.charts().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["CPU & RAM"]);
        assert!(!page.template.has_position_data);
        assert!(page.template.error_labels_html.contains("Local Position"));
        assert_eq!(page.template.plots.len(), 1);
        assert_eq!(page.template.plots[0].fragment, "Nav-CPU-_-RAM");
        // parameter and message tables follow the charts
        assert!(matches!(page.items.last(), Some(PageItem::Html(h)) if h.contains("Logged Messages")));
    }

    #[test]
    fn test_pid_page_without_topics() {
        let log = cpu_log();
        let page = get_pid_analysis_plots(&log, &PlotConfig::default());
        assert!(matches!(&page.items[0], PageItem::Html(h) if h == MISSING_TOPICS_HTML));
        assert!(page.template.title_html.contains("PID-Analyzer"));
    }
}
