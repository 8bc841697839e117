//! Forecasting backends and their dispatch.

use chrono::{DateTime, NaiveDate, Utc};

use crate::arima::{forecast_arima, ArimaOrder, ArimaSpec, SeasonalOrder};
use crate::error::{ForecastError, Result};
use crate::prophet::{forecast_prophet, ProphetSpec};
use crate::series::Series;

// ETS model types from anofox-forecast crate
use anofox_forecast::models::exponential::{ETSSpec, ETS as ETSModel};
use anofox_forecast::prelude::Forecaster;

/// ARIMA(5,1,0)
pub const ARIMA_SPEC: ArimaSpec = ArimaSpec {
    order: ArimaOrder { p: 5, d: 1, q: 0 },
    seasonal: None,
};

/// SARIMA(1,1,1)(1,1,1,12)
pub const SARIMA_SPEC: ArimaSpec = ArimaSpec {
    order: ArimaOrder { p: 1, d: 1, q: 1 },
    seasonal: Some(SeasonalOrder {
        p: 1,
        d: 1,
        q: 1,
        period: 12,
    }),
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Exponential smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtsSpec {
    /// ETS notation, e.g. "ANA" (additive error, no trend, additive season)
    pub notation: &'static str,
    pub period: usize,
}

impl EtsSpec {
    /// Two full seasonal cycles are needed to initialize the seasonal state.
    pub fn min_observations(&self) -> usize {
        2 * self.period.max(1)
    }
}

pub const ETS_SPEC: EtsSpec = EtsSpec {
    notation: "ANA",
    period: 12,
};

/// A forecasting backend together with its fixed hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backend {
    Prophet(ProphetSpec),
    Arima(ArimaSpec),
    Sarima(ArimaSpec),
    Ets(EtsSpec),
}

impl std::str::FromStr for Backend {
    type Err = ForecastError;

    /// Names are matched exactly.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Prophet" => Ok(Backend::Prophet(ProphetSpec::default())),
            "ARIMA" => Ok(Backend::Arima(ARIMA_SPEC)),
            "SARIMA" => Ok(Backend::Sarima(SARIMA_SPEC)),
            "ETS" => Ok(Backend::Ets(ETS_SPEC)),
            _ => Err(ForecastError::InvalidModel(s.to_string())),
        }
    }
}

impl Backend {
    /// The model name as accepted by `from_str` and echoed in results.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Prophet(_) => "Prophet",
            Backend::Arima(_) => "ARIMA",
            Backend::Sarima(_) => "SARIMA",
            Backend::Ets(_) => "ETS",
        }
    }

    /// Forecast one value per date of `grid`, which starts after the history.
    ///
    /// The step-based backends project `grid.len()` steps past the last
    /// observation; the Prophet-style backend is evaluated on the dates.
    pub fn forecast(&self, series: &Series, grid: &[NaiveDate]) -> Result<Vec<f64>> {
        if series.values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }

        let horizon = grid.len();
        let point = match self {
            Backend::Prophet(spec) => {
                forecast_prophet(&series.timestamps, &series.values, grid, spec)?
            }
            Backend::Arima(spec) | Backend::Sarima(spec) => {
                forecast_arima(&series.values, horizon, spec)?
            }
            Backend::Ets(spec) => forecast_ets(&series.values, horizon, spec)?,
        };

        if point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite forecast",
                self.name()
            )));
        }
        if point.len() != horizon {
            return Err(ForecastError::ComputationError(format!(
                "{} returned {} values for a horizon of {}",
                self.name(),
                point.len(),
                horizon
            )));
        }
        Ok(point)
    }
}

/// Names of the available models.
pub fn list_models() -> Vec<String> {
    ["Prophet", "ARIMA", "SARIMA", "ETS"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Forecast using the anofox-forecast ETS model.
fn forecast_ets(values: &[f64], horizon: usize, spec: &EtsSpec) -> Result<Vec<f64>> {
    use anofox_forecast::core::TimeSeriesBuilder;

    let needed = spec.min_observations();
    if values.len() < needed {
        return Err(ForecastError::InsufficientData {
            needed,
            got: values.len(),
        });
    }
    if horizon == 0 {
        return Ok(Vec::new());
    }

    let ets_spec = ETSSpec::from_notation(spec.notation).map_err(|e| {
        ForecastError::ComputationError(format!(
            "Invalid ETS model specification '{}': {}",
            spec.notation, e
        ))
    })?;

    let seasonal_period = if ets_spec.has_seasonal() && spec.period > 1 {
        spec.period
    } else {
        1
    };

    // The model only needs the observation order; one synthetic day per
    // observation keeps the index strictly increasing even when the history
    // repeats a timestamp.
    let timestamps = (0..values.len() as i64)
        .map(|i| DateTime::<Utc>::from_timestamp(i * SECONDS_PER_DAY, 0))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            ForecastError::ComputationError("Series too long to index".to_string())
        })?;

    let time_series = TimeSeriesBuilder::new()
        .timestamps(timestamps)
        .values(values.to_vec())
        .build()
        .map_err(|e| {
            ForecastError::ComputationError(format!("Failed to build TimeSeries: {}", e))
        })?;

    let mut forecaster = ETSModel::new(ets_spec, seasonal_period);

    forecaster
        .fit(&time_series)
        .map_err(|e| ForecastError::ComputationError(format!("Failed to fit ETS model: {}", e)))?;

    let forecast = forecaster.predict(horizon).map_err(|e| {
        ForecastError::ComputationError(format!("Failed to generate ETS forecasts: {}", e))
    })?;

    // Univariate: first dimension
    Ok(forecast.point().first().cloned().unwrap_or_default())
}
