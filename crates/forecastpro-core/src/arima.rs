//! ARIMA and seasonal ARIMA forecasting.
//!
//! The series is differenced according to the order, an ARMA model is fit
//! to the differenced series with the two-stage Hannan-Rissanen regression
//! (a long autoregression supplies residual estimates, then the AR and MA
//! lags are regressed jointly), forecasts are produced recursively and
//! integrated back to the original scale. No constant term is fit, matching
//! the usual convention for differenced models.
//!
//! When no difference could be applied the model is fit around the sample
//! mean instead.
//!
//! Short histories degrade gracefully: a difference is skipped when the
//! series is not longer than its lag, and lags that the remaining history
//! cannot support are dropped (largest first).

use crate::error::{ForecastError, Result};
use crate::regression::{fit_ols, variance, LinearFit};

/// Non-seasonal `(p, d, q)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal `(P, D, Q, s)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Full model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaSpec {
    pub order: ArimaOrder,
    pub seasonal: Option<SeasonalOrder>,
}

impl ArimaSpec {
    /// Lags of the expanded AR polynomial `φ(B)Φ(B^s)`.
    pub fn ar_lags(&self) -> Vec<usize> {
        let (big_p, s) = self
            .seasonal
            .map(|so| (so.p, so.period))
            .unwrap_or((0, 0));
        expand_lags(self.order.p, big_p, s)
    }

    /// Lags of the expanded MA polynomial `θ(B)Θ(B^s)`.
    pub fn ma_lags(&self) -> Vec<usize> {
        let (big_q, s) = self
            .seasonal
            .map(|so| (so.q, so.period))
            .unwrap_or((0, 0));
        expand_lags(self.order.q, big_q, s)
    }

    /// Lags of the differences to apply, regular first.
    pub fn difference_lags(&self) -> Vec<usize> {
        let mut lags = vec![1; self.order.d];
        if let Some(so) = self.seasonal {
            lags.extend(std::iter::repeat(so.period).take(so.d));
        }
        lags
    }
}

fn expand_lags(p: usize, big_p: usize, s: usize) -> Vec<usize> {
    let mut lags: Vec<usize> = Vec::new();
    let big_p = if s == 0 { 0 } else { big_p };
    for i in 0..=p {
        for j in 0..=big_p {
            let lag = i + j * s;
            if lag > 0 && !lags.contains(&lag) {
                lags.push(lag);
            }
        }
    }
    lags.sort_unstable();
    lags
}

/// Forecast `horizon` steps past the end of `values`.
pub fn forecast_arima(values: &[f64], horizon: usize, spec: &ArimaSpec) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::InvalidInput(
            "Series contains non-finite values".to_string(),
        ));
    }
    if horizon == 0 {
        return Ok(Vec::new());
    }

    // Difference, remembering each level for integration.
    let mut stages: Vec<(usize, Vec<f64>)> = Vec::new();
    let mut w = values.to_vec();
    for lag in spec.difference_lags() {
        if w.len() <= lag {
            tracing::debug!(lag, len = w.len(), "Skipping difference: history too short");
            continue;
        }
        let diffed: Vec<f64> = (lag..w.len()).map(|t| w[t] - w[t - lag]).collect();
        stages.push((lag, std::mem::replace(&mut w, diffed)));
    }

    // Without any difference the ARMA part is fit around the sample mean.
    let level = if stages.is_empty() {
        w.iter().sum::<f64>() / w.len() as f64
    } else {
        0.0
    };
    let centered: Vec<f64> = w.iter().map(|v| v - level).collect();

    let mut future: Vec<f64> = forecast_arma(&centered, horizon, spec.ar_lags(), spec.ma_lags())?
        .into_iter()
        .map(|v| v + level)
        .collect();

    for (lag, before) in stages.into_iter().rev() {
        let mut extended = before;
        let n_before = extended.len();
        for step in future.iter() {
            let v = step + extended[extended.len() - lag];
            extended.push(v);
        }
        future = extended.split_off(n_before);
    }

    Ok(future)
}

/// Hannan-Rissanen ARMA forecast of a (differenced) series.
fn forecast_arma(
    w: &[f64],
    horizon: usize,
    mut ar: Vec<usize>,
    mut ma: Vec<usize>,
) -> Result<Vec<f64>> {
    let n = w.len();
    let requested = (ar.len(), ma.len());

    // Residual estimates from a long autoregression.
    let mut residuals = vec![0.0; n];
    if !ma.is_empty() {
        let max_ma = ma.iter().copied().max().unwrap_or(0);
        let long_order = (2 * max_ma).min(n / 3);
        match long_ar_residuals(w, long_order)? {
            Some(e) => residuals = e,
            None => ma.clear(),
        }
    }

    trim_lags(n, &mut ar, &mut ma);
    if (ar.len(), ma.len()) != requested {
        tracing::debug!(
            n,
            ar = ?ar,
            ma = ?ma,
            "Reduced ARMA lags to fit the available history"
        );
    }

    if ar.is_empty() && ma.is_empty() {
        return Ok(vec![0.0; horizon]);
    }

    let last = w[n - 1];
    if variance(w) <= 1e-12 * (1.0 + last * last) {
        return Ok(vec![last; horizon]);
    }

    let start = ar.iter().chain(ma.iter()).copied().max().unwrap_or(0);
    let features = |t: usize, w: &[f64], e: &[f64]| -> Vec<f64> {
        ar.iter()
            .map(|&l| w[t - l])
            .chain(ma.iter().map(|&l| e[t - l]))
            .collect()
    };

    let rows: Vec<Vec<f64>> = (start..n).map(|t| features(t, w, &residuals)).collect();
    let target: Vec<f64> = w[start..].to_vec();
    let mut fit: LinearFit = fit_ols(&rows, &target, false)?;
    make_stationary(&ar, &mut fit.coefficients[..ar.len()]);

    let mut ext_e = vec![0.0; n];
    for (t, row) in (start..n).zip(rows.iter()) {
        ext_e[t] = w[t] - fit.predict(row);
    }
    let mut ext_w = w.to_vec();

    let mut out = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let t = ext_w.len();
        let pred = fit.predict(&features(t, &ext_w, &ext_e));
        ext_w.push(pred);
        ext_e.push(0.0);
        out.push(pred);
    }

    Ok(out)
}

/// Shrink the AR coefficients towards zero until the recursion no longer
/// explodes. Each pass scales the lag-`l` coefficient by `AR_SHRINK^l`,
/// which moves every root of the AR polynomial outward.
fn make_stationary(lags: &[usize], coefs: &mut [f64]) {
    if is_stationary(&dense_ar(lags, coefs)) {
        return;
    }
    for _ in 0..MAX_SHRINK_PASSES {
        for (c, &l) in coefs.iter_mut().zip(lags) {
            *c *= AR_SHRINK.powi(l as i32);
        }
        if is_stationary(&dense_ar(lags, coefs)) {
            tracing::debug!(ar = ?coefs, "Shrunk explosive AR coefficients");
            return;
        }
    }
    tracing::debug!("AR coefficients stayed explosive, dropping the AR terms");
    coefs.iter_mut().for_each(|c| *c = 0.0);
}

const AR_SHRINK: f64 = 0.9;
const MAX_SHRINK_PASSES: usize = 50;

/// Coefficients of lags `1..=max_lag`, zero where a lag is absent.
fn dense_ar(lags: &[usize], coefs: &[f64]) -> Vec<f64> {
    let mut dense = vec![0.0; lags.iter().copied().max().unwrap_or(0)];
    for (&l, &c) in lags.iter().zip(coefs) {
        dense[l - 1] = c;
    }
    dense
}

/// Whether `w_t = a_1 w_{t-1} + ... + a_p w_{t-p}` is stationary, by the
/// step-down recursion: every partial autocorrelation must lie in (-1, 1).
fn is_stationary(a: &[f64]) -> bool {
    let mut a = a.to_vec();
    while let Some(&r) = a.last() {
        if !r.is_finite() || r.abs() >= 1.0 {
            return false;
        }
        let k = a.len();
        let denom = 1.0 - r * r;
        a = (0..k - 1)
            .map(|j| (a[j] + r * a[k - 2 - j]) / denom)
            .collect();
    }
    true
}

/// Residuals of an AR(`order`) regression, zero before the first fitted
/// point. `None` when the history cannot support the regression.
fn long_ar_residuals(w: &[f64], order: usize) -> Result<Option<Vec<f64>>> {
    let n = w.len();
    if order == 0 || n <= 2 * order {
        return Ok(None);
    }
    if variance(w) <= f64::EPSILON {
        return Ok(Some(vec![0.0; n]));
    }

    let rows: Vec<Vec<f64>> = (order..n)
        .map(|t| (1..=order).map(|l| w[t - l]).collect())
        .collect();
    let fit = fit_ols(&rows, &w[order..], false)?;

    let mut e = vec![0.0; n];
    for (t, row) in (order..n).zip(rows.iter()) {
        e[t] = w[t] - fit.predict(row);
    }
    Ok(Some(e))
}

/// Drop the largest lag until the regression has more rows than parameters.
fn trim_lags(n: usize, ar: &mut Vec<usize>, ma: &mut Vec<usize>) {
    loop {
        let max_lag = match ar.iter().chain(ma.iter()).copied().max() {
            Some(l) => l,
            None => return,
        };
        let params = ar.len() + ma.len();
        if max_lag < n && n - max_lag > params {
            return;
        }
        ar.retain(|&l| l != max_lag);
        ma.retain(|&l| l != max_lag);
    }
}
