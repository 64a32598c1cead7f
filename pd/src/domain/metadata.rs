//! Document metadata

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::coerce;

/// Template-level settings stored next to the cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sampling temperature, 0.00..=2.00
    #[serde(default, deserialize_with = "coerce::temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update for [`Metadata`]; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub temperature: Option<f64>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.temperature.is_none()
    }
}

impl Metadata {
    pub fn apply(&mut self, patch: MetadataPatch) {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = Some(coerce::clamp_temperature(temperature));
        }
    }

    /// Temperature as shown to users, defaulting to 1.0
    pub fn effective_temperature(&self) -> f64 {
        self.temperature.unwrap_or(1.0)
    }
}
