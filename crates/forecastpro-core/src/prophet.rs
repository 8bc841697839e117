//! Prophet-style additive regression forecaster.
//!
//! `y(t) = trend(t) + Σ seasonality(t)` where the trend is piecewise linear
//! with changepoints spread over the first part of the history and each
//! seasonality is a Fourier series. Seasonalities are switched on by the
//! span and spacing of the history. Coefficients are MAP estimates under
//! Gaussian priors with the configured scales, solved as penalized least
//! squares on a max-abs scaled target.
//!
//! Unlike the step-based backends this one is evaluated directly on the
//! requested dates.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::dates::days_since_epoch;
use crate::error::{ForecastError, Result};
use crate::regression::fit_penalized;

/// Residual variance assumed when turning prior scales into penalties
/// (a residual standard deviation of 5% of the scaled target).
const ASSUMED_NOISE_VARIANCE: f64 = 0.0025;

/// A Fourier seasonality and the history needed to enable it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub fourier_order: usize,
    /// Minimum history span, in days
    pub min_span_days: f64,
    /// Observations must be spaced more tightly than this, in days
    pub max_spacing_days: f64,
}

pub const YEARLY: Seasonality = Seasonality {
    name: "yearly",
    period_days: 365.25,
    fourier_order: 10,
    min_span_days: 730.0,
    max_spacing_days: f64::INFINITY,
};

pub const WEEKLY: Seasonality = Seasonality {
    name: "weekly",
    period_days: 7.0,
    fourier_order: 3,
    min_span_days: 14.0,
    max_spacing_days: 7.0,
};

pub const DAILY: Seasonality = Seasonality {
    name: "daily",
    period_days: 1.0,
    fourier_order: 4,
    min_span_days: 2.0,
    max_spacing_days: 1.0,
};

/// Fixed configuration of the Prophet-style backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProphetSpec {
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
}

impl Default for ProphetSpec {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
        }
    }
}

/// Design of a fitted model: how to turn a timestamp into a feature row.
struct Design {
    origin_days: f64,
    span_days: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
}

impl Design {
    fn row(&self, ts: NaiveDateTime) -> Vec<f64> {
        let days = days_since_epoch(ts);
        let mut row = vec![1.0];

        if self.span_days > 0.0 {
            let t = (days - self.origin_days) / self.span_days;
            row.push(t);
            row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
        }

        for s in &self.seasonalities {
            for k in 1..=s.fourier_order {
                let x = 2.0 * std::f64::consts::PI * k as f64 * days / s.period_days;
                row.push(x.sin());
                row.push(x.cos());
            }
        }
        row
    }

    fn penalties(&self, spec: &ProphetSpec) -> Vec<f64> {
        let mut penalties = vec![0.0];
        if self.span_days > 0.0 {
            penalties.push(0.0);
            let cp = ASSUMED_NOISE_VARIANCE / spec.changepoint_prior_scale.powi(2);
            penalties.extend(std::iter::repeat(cp).take(self.changepoints.len()));
        }
        let seasonal = ASSUMED_NOISE_VARIANCE / spec.seasonality_prior_scale.powi(2);
        let n_seasonal: usize = self
            .seasonalities
            .iter()
            .map(|s| 2 * s.fourier_order)
            .sum();
        penalties.extend(std::iter::repeat(seasonal).take(n_seasonal));
        penalties
    }
}

/// Fit on `(timestamps, values)` (sorted by timestamp) and predict each
/// date of `grid` at midnight.
pub fn forecast_prophet(
    timestamps: &[NaiveDateTime],
    values: &[f64],
    grid: &[NaiveDate],
    spec: &ProphetSpec,
) -> Result<Vec<f64>> {
    if timestamps.len() != values.len() {
        return Err(ForecastError::InvalidInput(
            "Timestamps and values must have the same length".to_string(),
        ));
    }
    let n = values.len();
    if n < 2 {
        return Err(ForecastError::InsufficientData { needed: 2, got: n });
    }
    if grid.is_empty() {
        return Ok(Vec::new());
    }

    let design = build_design(timestamps, spec);
    tracing::debug!(
        n,
        changepoints = design.changepoints.len(),
        seasonalities = ?design.seasonalities.iter().map(|s| s.name).collect::<Vec<_>>(),
        "Fitting Prophet-style model"
    );

    let y_scale = values
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);
    let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();
    let rows: Vec<Vec<f64>> = timestamps.iter().map(|&ts| design.row(ts)).collect();

    let fit = fit_penalized(&rows, &y, &design.penalties(spec))?;

    Ok(grid
        .iter()
        .map(|d| fit.predict(&design.row(d.and_time(NaiveTime::MIN))) * y_scale)
        .collect())
}

fn build_design(timestamps: &[NaiveDateTime], spec: &ProphetSpec) -> Design {
    let days: Vec<f64> = timestamps.iter().map(|&ts| days_since_epoch(ts)).collect();
    let n = days.len();
    let origin_days = days[0];
    let span_days = days[n - 1] - origin_days;

    let changepoints = if span_days > 0.0 {
        let hist_size = (n as f64 * spec.changepoint_range).floor() as usize;
        let n_cp = spec.n_changepoints.min(hist_size.saturating_sub(1));
        (1..=n_cp)
            .map(|i| {
                let idx = (i as f64 * (hist_size - 1) as f64 / n_cp as f64).round() as usize;
                (days[idx] - origin_days) / span_days
            })
            .collect()
    } else {
        Vec::new()
    };

    let min_spacing = days
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);

    let seasonalities = [YEARLY, WEEKLY, DAILY]
        .into_iter()
        .filter(|s| span_days >= s.min_span_days && min_spacing < s.max_spacing_days)
        .collect();

    Design {
        origin_days,
        span_days,
        changepoints,
        seasonalities,
    }
}
