//! Wire codec
//!
//! Maps between the JSON wire form and domain values. Readers are written
//! against `serde_json::Value` by hand so every failure can name the field
//! and the offending code instead of surfacing a generic serde message.

pub mod game;
pub mod sequence;
pub mod tables;

use crate::core::{EntityId, Result, SyncError, Version};
use serde_json::{Map, Value as JsonValue};
use tables::CodeTable;

pub use game::{decode_game_draft, encode_game};
pub use sequence::{decode_element, decode_sequence, encode_element, encode_sequence};

/// Bidirectional mapping of a domain value to its wire form.
pub trait WireCodec: Sized {
    fn to_wire(&self) -> JsonValue;

    fn from_wire(value: &JsonValue) -> Result<Self>;

    fn from_json_str(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)?;
        Self::from_wire(&value)
    }
}

/// Starts an object carrying the identity fields every entity has.
pub(crate) fn stamped(id: EntityId, version: Version) -> Map<String, JsonValue> {
    let mut obj = Map::new();
    obj.insert("id".into(), JsonValue::from(id.to_wire()));
    obj.insert("version".into(), JsonValue::from(version));
    obj
}

/// Read-only view over a JSON object with typed, field-reporting accessors.
///
/// `null` is treated the same as an absent key.
#[derive(Debug, Clone, Copy)]
pub struct WireObject<'a> {
    map: &'a Map<String, JsonValue>,
}

impl<'a> WireObject<'a> {
    pub fn new(value: &'a JsonValue, what: &str) -> Result<Self> {
        value
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| SyncError::invalid(what, "expected a JSON object"))
    }

    fn get(&self, key: &str) -> Option<&'a JsonValue> {
        match self.map.get(key) {
            Some(JsonValue::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn id(&self) -> Result<EntityId> {
        Ok(EntityId::from_wire(self.opt_u64("id")?.unwrap_or(0)))
    }

    /// The optimistic lock token, when the caller sent one.
    pub fn version(&self) -> Result<Option<Version>> {
        self.opt_u64("version")
    }

    pub fn str(&self, key: &str) -> Result<&'a str> {
        self.opt_str(key)?
            .ok_or_else(|| SyncError::invalid(key, "required field is missing"))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(SyncError::invalid(key, format!("expected a string, got {other}"))),
        }
    }

    pub fn string_or_default(&self, key: &str) -> Result<String> {
        Ok(self.opt_str(key)?.unwrap_or_default().to_string())
    }

    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| SyncError::invalid(key, format!("expected an integer, got {number}"))),
            Some(other) => Err(SyncError::invalid(key, format!("expected an integer, got {other}"))),
        }
    }

    pub fn opt_i32(&self, key: &str) -> Result<Option<i32>> {
        self.opt_i64(key)?
            .map(|raw| {
                i32::try_from(raw).map_err(|_| SyncError::invalid(key, format!("{raw} is out of range")))
            })
            .transpose()
    }

    pub fn i32(&self, key: &str) -> Result<i32> {
        self.opt_i32(key)?
            .ok_or_else(|| SyncError::invalid(key, "required field is missing"))
    }

    pub fn i32_or(&self, key: &str, default: i32) -> Result<i32> {
        Ok(self.opt_i32(key)?.unwrap_or(default))
    }

    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        self.opt_i64(key)?
            .map(|raw| {
                u64::try_from(raw).map_err(|_| SyncError::invalid(key, format!("{raw} must not be negative")))
            })
            .transpose()
    }

    pub fn u64(&self, key: &str) -> Result<u64> {
        self.opt_u64(key)?
            .ok_or_else(|| SyncError::invalid(key, "required field is missing"))
    }

    pub fn opt_u32(&self, key: &str) -> Result<Option<u32>> {
        self.opt_u64(key)?
            .map(|raw| {
                u32::try_from(raw).map_err(|_| SyncError::invalid(key, format!("{raw} is out of range")))
            })
            .transpose()
    }

    pub fn u32(&self, key: &str) -> Result<u32> {
        self.opt_u32(key)?
            .ok_or_else(|| SyncError::invalid(key, "required field is missing"))
    }

    pub fn u32_or(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self.opt_u32(key)?.unwrap_or(default))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(JsonValue::Bool(flag)) => Ok(*flag),
            Some(other) => Err(SyncError::invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    /// Decodes a required enum code stored under the table's own field name.
    pub fn code<T: CodeTable>(&self) -> Result<T> {
        self.code_at(T::FIELD)
    }

    pub fn code_at<T: CodeTable>(&self, key: &str) -> Result<T> {
        T::decode_field(key, self.str(key)?)
    }

    /// An array of nested values; absent means empty.
    pub fn array(&self, key: &str) -> Result<&'a [JsonValue]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(JsonValue::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(SyncError::invalid(key, format!("expected an array, got {other}"))),
        }
    }

    pub fn objects(&self, key: &str) -> Result<Vec<WireObject<'a>>> {
        self.array(key)?
            .iter()
            .map(|item| WireObject::new(item, key))
            .collect()
    }

    pub fn opt_object(&self, key: &str) -> Result<Option<WireObject<'a>>> {
        self.get(key).map(|value| WireObject::new(value, key)).transpose()
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>> {
        self.array(key)?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SyncError::invalid(key, format!("expected a string, got {item}")))
            })
            .collect()
    }
}
