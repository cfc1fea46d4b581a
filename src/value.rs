//! Document value model
//!
//! Documents coming out of a document store are nested key/value records whose
//! leaves can be plain scalars, binary payloads or opaque object identifiers.
//! `Value` is the closed set of kinds the transformer has to distinguish, and
//! `Document` keeps fields in their original order so overflow capture
//! reproduces the source layout.

use base64::{engine::general_purpose::STANDARD, Engine};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Number;
use std::fmt;

static OBJECT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{24}$").unwrap()
});

/// An ordered document: field name to value, in insertion order
pub type Document = IndexMap<String, Value>;

/// A 12-byte opaque document identifier (MongoDB ObjectId)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Parse the canonical 24 character hex form
    pub fn parse_hex(s: &str) -> Option<Self> {
        if !OBJECT_ID_REGEX.is_match(s) {
            return None;
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(ObjectId(bytes))
    }

    /// Canonical string form: 24 lowercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

/// A document value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    /// Raw binary payload; not guaranteed to be valid UTF-8
    Binary(Vec<u8>),
    Identifier(ObjectId),
    Document(Document),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON number form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<ObjectId> for Value {
    fn from(oid: ObjectId) -> Self {
        Value::Identifier(oid)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<serde_json::Value> for Value {
    /// Converts MongoDB extended JSON: `{"$oid": ..}` becomes an identifier and
    /// `{"$binary": ..}` becomes a binary payload. Anything that does not match
    /// those shapes exactly is kept as a plain document.
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                if let Some(special) = extended_json(&obj) {
                    return special;
                }
                Value::Document(document_from_json(obj))
            }
        }
    }
}

/// Convert a JSON object into a document, applying extended JSON rules to
/// nested values
pub fn document_from_json(obj: serde_json::Map<String, serde_json::Value>) -> Document {
    obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

fn extended_json(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    if obj.len() == 1 {
        if let Some(serde_json::Value::String(s)) = obj.get("$oid") {
            return ObjectId::parse_hex(s).map(Value::Identifier);
        }
        // Canonical form: {"$binary": {"base64": "...", "subType": "00"}}
        if let Some(serde_json::Value::Object(body)) = obj.get("$binary") {
            let encoded = body.get("base64")?.as_str()?;
            return STANDARD.decode(encoded).ok().map(Value::Binary);
        }
    }

    // Legacy form: {"$binary": "...", "$type": "00"}
    if obj.len() == 2 && obj.contains_key("$type") {
        let encoded = obj.get("$binary")?.as_str()?;
        return STANDARD.decode(encoded).ok().map(Value::Binary);
    }

    None
}

#[derive(serde::Serialize)]
struct BinaryBody<'a> {
    base64: String,
    #[serde(rename = "subType")]
    sub_type: &'a str,
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Binary(bytes) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(
                    "$binary",
                    &BinaryBody {
                        base64: STANDARD.encode(bytes),
                        sub_type: "00",
                    },
                )?;
                map.end()
            }
            Value::Identifier(oid) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$oid", &oid.to_hex())?;
                map.end()
            }
            Value::Document(doc) => doc.serialize(serializer),
            Value::Array(items) => items.serialize(serializer),
        }
    }
}
