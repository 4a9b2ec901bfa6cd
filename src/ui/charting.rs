use crate::time_series::TimeSeriesPoint;

/// X (seconds) and Y (wpm) upper bounds for the live-speed chart.
pub fn compute_chart_params(points: &[TimeSeriesPoint], finished_secs: Option<f64>) -> (f64, f64) {
    let highest_wpm = points.iter().map(|p| p.wpm).fold(0.0, f64::max);

    let overall_duration = points
        .last()
        .map(|p| p.t)
        .into_iter()
        .chain(finished_secs)
        .fold(1.0, f64::max);

    (overall_duration, highest_wpm.round())
}

/// Points for the history chart: race number against wpm.
pub fn history_points(wpms: &[u32]) -> Vec<(f64, f64)> {
    wpms.iter()
        .enumerate()
        .map(|(idx, wpm)| ((idx + 1) as f64, f64::from(*wpm)))
        .collect()
}

pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
