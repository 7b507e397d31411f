use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub const DEAL_STAGE: &str = "dealstage";
pub const PROCESSED_FLAG: &str = "ajuste_pantalla";
pub const ORIGIN_TAG: &str = "utm_source";

/// A single property change in a partial deal update.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyUpdate {
    Set(Value),
    /// Sent as an explicit JSON `null`.
    Clear,
}

impl PropertyUpdate {
    /// Reads a request field that was present in the body. JSON `null`
    /// becomes [`PropertyUpdate::Clear`]; every other value is written as-is.
    pub fn from_present(value: &Value) -> Self {
        match value {
            Value::Null => Self::Clear,
            other => Self::Set(other.clone()),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Set(value) => value.clone(),
            Self::Clear => Value::Null,
        }
    }
}

/// Partial update for a deal. Properties not listed are left untouched by
/// the CRM.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DealPatch {
    properties: BTreeMap<String, PropertyUpdate>,
}

impl DealPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.properties.insert(property.into(), PropertyUpdate::Set(value.into()));
        self
    }

    /// Records `update` under `property` when the caller supplied it.
    pub fn apply(&mut self, property: &str, update: Option<&PropertyUpdate>) -> &mut Self {
        if let Some(update) = update {
            self.properties.insert(property.to_string(), update.clone());
        }
        self
    }

    pub fn get(&self, property: &str) -> Option<&PropertyUpdate> {
        self.properties.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// The `properties` object of a CRM update request.
    pub fn to_properties(&self) -> Map<String, Value> {
        self.properties.iter().map(|(name, update)| (name.clone(), update.to_value())).collect()
    }
}
