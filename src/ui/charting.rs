use typespeed::report::SpeedPoint;

/// Chart coordinates: x is the 1-based trial number within the window
pub fn chart_data(points: &[SpeedPoint]) -> Vec<(f64, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| ((i + 1) as f64, p.wpm))
        .collect()
}

/// X (trial number) and Y (WPM) upper bounds for the history chart
pub fn compute_chart_params(points: &[SpeedPoint]) -> (f64, f64) {
    let highest_wpm = points.iter().map(|p| p.wpm).fold(0.0, f64::max);

    // a single point still needs a non-empty x range
    let x_max = (points.len() as f64).max(2.0);
    let y_max = ((highest_wpm / 10.0).ceil() * 10.0).max(10.0);

    (x_max, y_max)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn points(speeds: &[f64]) -> Vec<SpeedPoint> {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        speeds
            .iter()
            .map(|&wpm| SpeedPoint { timestamp: ts, wpm })
            .collect()
    }

    #[test]
    fn test_compute_chart_params_empty() {
        assert_eq!(compute_chart_params(&[]), (2.0, 10.0));
    }

    #[test]
    fn test_compute_chart_params_rounds_up() {
        assert_eq!(compute_chart_params(&points(&[12.0, 47.3, 30.0])), (3.0, 50.0));
        assert_eq!(compute_chart_params(&points(&[60.0])), (2.0, 60.0));
    }

    #[test]
    fn test_chart_data_numbers_trials() {
        assert_eq!(
            chart_data(&points(&[12.0, 47.3])),
            vec![(1.0, 12.0), (2.0, 47.3)]
        );
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
