use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::OfferError;

/// HubSpot deal properties the offer reader projects.
pub const DEAL_PROPERTIES: &[&str] = &[
    "amount",
    "periodos",
    "pago_por_periodo",
    "tasa_de_interes_semanal",
    "dealname",
    "ajuste_pantalla",
];

pub const CONTACT_PROPERTIES: &[&str] = &["firstname", "lastname"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl DealId {
    /// Decodes a `deal_id` request value.
    ///
    /// Non-empty strings and non-zero numbers are accepted verbatim; missing,
    /// `null`, empty, zero, dot-only and non-scalar values are rejected
    /// before any remote call is made.
    pub fn from_request(value: Option<&Value>) -> Result<Self, OfferError> {
        match value {
            Some(Value::String(raw)) if is_addressable(raw) => Ok(Self(raw.clone())),
            Some(Value::Number(number)) if number.as_f64().is_some_and(|n| n != 0.0) => {
                Ok(Self(number.to_string()))
            }
            _ => Err(OfferError::MissingDealId),
        }
    }

    /// Decodes a `deal_id` query parameter; empty means missing.
    pub fn from_query(value: Option<&str>) -> Result<Self, OfferError> {
        match value {
            Some(raw) if is_addressable(raw) => Ok(Self(raw.to_string())),
            _ => Err(OfferError::MissingDealId),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `.` and `..` would resolve as relative path segments in the CRM URL.
pub fn is_addressable(id: &str) -> bool {
    !id.is_empty() && !id.chars().all(|c| c == '.')
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a deal as decoded at the CRM boundary.
///
/// Numeric properties stay as raw text; their interpretation lives in
/// [`crate::normalize`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DealRecord {
    pub id: DealId,
    pub amount: Option<String>,
    pub periods: Option<String>,
    pub payment: Option<String>,
    pub weekly_rate: Option<String>,
    pub deal_name: Option<String>,
    pub already_processed: bool,
    pub contact_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// `ajuste_pantalla` is stored either as the string `"true"` or as a JSON
/// boolean; every other representation means "not processed yet".
pub fn decode_processed_flag(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text == "true",
        _ => false,
    }
}

/// Renders a raw CRM property as text. HubSpot returns strings, but numbers
/// and booleans are tolerated; `null` and empty strings count as absent.
pub fn property_text(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    }
}
