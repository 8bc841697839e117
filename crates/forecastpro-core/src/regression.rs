//! Least-squares fitting shared by the ARIMA-family and Prophet-style
//! backends, on top of anofox-regression.

use crate::error::{ForecastError, Result};
use anofox_regression::prelude::*;

/// Penalty applied to nominally unpenalized columns in [`fit_penalized`].
const MIN_PENALTY: f64 = 1e-10;

/// Fitted linear model `y = intercept + Σ coefficients[j] * x[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Ordinary least squares on row-major `rows` (n × k).
///
/// Aliased (collinear) columns come back with a zero coefficient. With no
/// feature columns the fit is the mean of `y` (or zero without intercept).
pub fn fit_ols(rows: &[Vec<f64>], y: &[f64], with_intercept: bool) -> Result<LinearFit> {
    let n = y.len();
    if rows.len() != n {
        return Err(ForecastError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            rows.len(),
            n
        )));
    }
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }

    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 {
        let intercept = if with_intercept {
            y.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        return Ok(LinearFit {
            intercept,
            coefficients: Vec::new(),
        });
    }

    let x_mat = faer::Mat::from_fn(n, k, |i, j| rows[i][j]);
    let y_col = faer::Col::from_fn(n, |i| y[i]);

    let fitted = OlsRegressor::builder()
        .with_intercept(with_intercept)
        .build()
        .fit(&x_mat, &y_col)
        .map_err(|e| ForecastError::ComputationError(format!("Least-squares fit failed: {}", e)))?;

    let intercept = fitted.intercept().filter(|v| v.is_finite()).unwrap_or(0.0);
    let coeffs_col = fitted.coefficients();
    let coefficients = (0..coeffs_col.nrows())
        .map(|i| coeffs_col[i])
        .map(|b| if b.is_finite() { b } else { 0.0 })
        .collect();

    Ok(LinearFit {
        intercept,
        coefficients,
    })
}

/// Least squares with an L2 penalty `penalties[j] * b_j²` per column.
///
/// Implemented by appending one pseudo-observation per column, so the
/// system stays overdetermined even with fewer observations than columns.
/// Columns with a zero penalty get `MIN_PENALTY` and are effectively free.
/// There is no implicit intercept: put an explicit column of ones in `rows`
/// for an unpenalized level.
pub fn fit_penalized(rows: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<LinearFit> {
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if penalties.len() != k {
        return Err(ForecastError::InvalidInput(format!(
            "Got {} penalties for {} columns",
            penalties.len(),
            k
        )));
    }

    let mut aug_rows = rows.to_vec();
    let mut aug_y = y.to_vec();
    for (j, &lambda) in penalties.iter().enumerate() {
        let mut row = vec![0.0; k];
        row[j] = lambda.max(MIN_PENALTY).sqrt();
        aug_rows.push(row);
        aug_y.push(0.0);
    }

    fit_ols(&aug_rows, &aug_y, false)
}

/// Population variance; zero for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
