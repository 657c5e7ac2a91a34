use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{PlayerError, Result};
use crate::format::{Card, TemplateNode};

/// Key under which the outcome of the most recent confirmation prompt is stored
pub const LAST_CONFIRMATION: &str = "lastConfirmation";

/// Named content referenced by steps.
///
/// Values are kept as raw JSON and decoded on demand, so a bag can hold
/// scalar text, cards, result lists and templates side by side.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataBag {
    values: Map<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let values: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self { values })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Decode the value under `key` into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| PlayerError::MissingData(key.to_string()))?;
        T::deserialize(value).map_err(|source| PlayerError::InvalidData {
            key: key.to_string(),
            source,
        })
    }

    /// Scalar text; numbers and booleans are rendered as they print.
    pub fn text(&self, key: &str) -> Result<String> {
        match self.values.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(_) => Err(PlayerError::InvalidData {
                key: key.to_string(),
                source: serde::de::Error::custom("expected a scalar value"),
            }),
            None => Err(PlayerError::MissingData(key.to_string())),
        }
    }

    pub fn card(&self, key: &str) -> Result<Card> {
        self.get(key)
    }

    pub fn result_list(&self, key: &str) -> Result<Vec<Card>> {
        self.get(key)
    }

    pub fn template(&self, key: &str) -> Result<TemplateNode> {
        self.get(key)
    }

    pub fn last_confirmation(&self) -> Option<bool> {
        self.values.get(LAST_CONFIRMATION).and_then(Value::as_bool)
    }

    /// Replace the stored confirmation, returning the previous one.
    pub fn set_last_confirmation(&mut self, value: Option<bool>) -> Option<bool> {
        let previous = self.last_confirmation();
        match value {
            Some(v) => {
                self.values.insert(LAST_CONFIRMATION.to_string(), Value::Bool(v));
            }
            None => {
                self.values.remove(LAST_CONFIRMATION);
            }
        }
        previous
    }

    /// Replace every `{{key}}` placeholder with the scalar text stored under `key`.
    ///
    /// Placeholders naming a missing or non-scalar value are left as written.
    pub fn interpolate(&self, template: &str) -> String {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                output.push_str(&rest[start..]);
                return output;
            };

            let key = after[..end].trim();
            match self.text(key) {
                Ok(value) => output.push_str(&value),
                Err(err) => {
                    log::warn!("Failed to interpolate {{{{{}}}}}: {}", key, err);
                    output.push_str(&rest[start..start + 2 + end + 2]);
                }
            }
            rest = &after[end + 2..];
        }

        output.push_str(rest);
        output
    }
}

impl From<Map<String, Value>> for DataBag {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}
