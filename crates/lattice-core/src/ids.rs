use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Backend-assigned identifier.
///
/// The API hands out integer keys today, but callers treat ids as opaque.
/// Numeric ids are written back as JSON numbers so request payloads keep
/// the shape the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(number) if number.to_string() == self.0 => serializer.serialize_i64(number),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(number) => Self::from(number),
            RawId::Text(text) => Self(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_keep_their_wire_shape() {
        let id: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn opaque_ids_stay_strings() {
        let id: EntityId = serde_json::from_str("\"7f3c-00a1\"").unwrap();
        assert_eq!(id.to_string(), "7f3c-00a1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7f3c-00a1\"");

        // leading zeros must not be collapsed into a number
        let padded = EntityId::new("007");
        assert_eq!(serde_json::to_string(&padded).unwrap(), "\"007\"");
    }
}
