//! Complex datatypes shared across models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR Extension: a url plus a single value[x]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extension {
    /// Identifies the meaning of the extension
    pub url: String,

    /// The value[x] key ("valueBoolean", "valueString", ...), flattened
    #[serde(flatten)]
    pub value: HashMap<String, Value>,
}

impl Extension {
    /// Extension carrying a boolean value
    pub fn boolean(url: impl Into<String>, value: bool) -> Self {
        let mut map = HashMap::new();
        map.insert("valueBoolean".to_string(), Value::Bool(value));
        Self {
            url: url.into(),
            value: map,
        }
    }
}
