//! JSON shapes of the HTTP API.

use std::collections::BTreeMap;

use forecastpro_core::{ForecastRecord, Prediction};
use serde::Serialize;

use crate::auth::Identity;

/// One forecast value as sent to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionRecord {
    /// `YYYY-MM-DD`
    pub ds: String,
    pub yhat: f64,
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Group")]
    pub group: Option<BTreeMap<String, String>>,
}

impl From<ForecastRecord> for PredictionRecord {
    fn from(record: ForecastRecord) -> Self {
        Self {
            ds: record.date.format("%Y-%m-%d").to_string(),
            yhat: record.value,
            metric: record.metric,
            model: record.model,
            group: record.group,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserInfo {
    pub email: Option<String>,
    pub uid: String,
}

impl From<&Identity> for UserInfo {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            uid: identity.uid.clone(),
        }
    }
}

/// Body of a successful `POST /predict/`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionRecord>,
    pub unique_group_data: BTreeMap<String, Vec<String>>,
    pub user_info: UserInfo,
}

impl PredictResponse {
    pub fn new(prediction: Prediction, identity: &Identity) -> Self {
        Self {
            predictions: prediction.records.into_iter().map(Into::into).collect(),
            unique_group_data: prediction.unique_group_values,
            user_info: identity.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}
