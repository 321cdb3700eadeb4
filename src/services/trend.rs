//! Least-squares trend fitting and parameter scoring.

use std::collections::HashMap;

use crate::domain::models::{
    AdjustmentDirection, MetricTrend, MetricType, OptimizationParameter, ParameterAdjustment,
    TelemetrySample,
};

const DEGRADING_AMPLIFY: f64 = 1.5;
const IMPROVING_DAMPEN: f64 = 0.5;
const OSCILLATION_CV: f64 = 0.5;
const OSCILLATION_MAX_SLOPE: f64 = 0.05;
const OSCILLATION_WEIGHT: f64 = 0.1;

/// Fit a trend to samples of one metric. `None` with fewer than `min_samples`
/// samples or when all samples share one timestamp.
pub fn fit_trend(metric: MetricType, samples: &[TelemetrySample], min_samples: usize) -> Option<MetricTrend> {
    if samples.len() < min_samples.max(2) {
        return None;
    }

    let origin = samples.iter().map(|s| s.recorded_at).min()?;
    let points: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| {
            let hours = (s.recorded_at - origin).num_milliseconds() as f64 / 3_600_000.0;
            (hours, s.value)
        })
        .collect();

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in &points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
        syy += (y - mean_y) * (y - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(MetricTrend {
        metric,
        sample_count: points.len(),
        mean: mean_y,
        slope,
        normalized_slope: slope / mean_y.abs().max(1.0),
        variance: syy / n,
    })
}

pub fn is_oscillating(trend: &MetricTrend) -> bool {
    trend.coefficient_of_variation() > OSCILLATION_CV
        && trend.normalized_slope.abs() < OSCILLATION_MAX_SLOPE
}

/// Adjustment score in [-1, 1] for one parameter: positive means raise it.
pub fn adjustment_score(
    parameter: &OptimizationParameter,
    trends: &HashMap<MetricType, MetricTrend>,
) -> f64 {
    let score: f64 = parameter
        .signals
        .iter()
        .filter_map(|signal| trends.get(&signal.metric).map(|t| (signal, t)))
        .map(|(signal, trend)| {
            let degradation = trend.degradation();
            let mut weighted = if degradation > 0.0 {
                degradation * DEGRADING_AMPLIFY
            } else {
                degradation * IMPROVING_DAMPEN
            };
            if is_oscillating(trend) {
                weighted += OSCILLATION_WEIGHT * trend.coefficient_of_variation();
            }
            weighted * signal.on_degrade.sign()
        })
        .sum();

    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Turn a score into a clamped adjustment, or `None` when the score is too
/// small or the clamped value would not move.
pub fn propose_adjustment(
    parameter: &OptimizationParameter,
    score: f64,
    threshold: f64,
    step_fraction: f64,
) -> Option<ParameterAdjustment> {
    if score.abs() <= threshold {
        return None;
    }

    let proposed = parameter.clamp(parameter.current_value + score * parameter.range() * step_fraction);
    if (proposed - parameter.current_value).abs() < f64::EPSILON {
        return None;
    }

    Some(ParameterAdjustment {
        category: parameter.category.clone(),
        name: parameter.name.clone(),
        previous_value: parameter.current_value,
        proposed_value: proposed,
        score,
        direction: if score > 0.0 {
            AdjustmentDirection::Increase
        } else {
            AdjustmentDirection::Decrease
        },
    })
}
