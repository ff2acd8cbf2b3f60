use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod error;
pub mod raw;

pub use error::{EdgeEndpoint, GraphDiagnostic};
pub use raw::{RawEdge, RawGraphPayload, RawNode};

/// Identifier as it arrives from a producer: some send numbers, some send strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl RawId {
    fn into_canonical(self) -> String {
        match self {
            RawId::Int(v) => v.to_string(),
            RawId::UInt(v) => v.to_string(),
            RawId::Float(v) => canonical_float(v),
            RawId::Text(v) => v.trim().to_string(),
        }
    }
}

/// Integral floats collapse to their integer spelling so `3`, `3.0` and `"3"` agree.
fn canonical_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}

pub(crate) fn deserialize_canonical<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_canonical)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into().trim().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value.to_string())
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value.to_string())
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_canonical(deserializer).map(Self)
            }
        }
    };
}

string_id!(
    /// Chapter or session node identifier, canonicalised to a string.
    NodeId
);
string_id!(EdgeId);
string_id!(
    /// Backend identifier of an uploaded document.
    DocumentId
);
string_id!(SessionId);

impl From<&NodeId> for SessionId {
    fn from(value: &NodeId) -> Self {
        SessionId(value.0.clone())
    }
}

/// Explicit node tag decided once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Chapter,
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Similarity between two chapters.
    Similarity,
    /// Anchor from a discussion session to its chapter.
    Session,
}

/// Axis-aligned size of the surface the graph is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for ContainerSize {
    fn default() -> Self {
        Self::new(600.0, 800.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_coerces_numbers_and_strings() {
        let from_int: NodeId = serde_json::from_str("42").unwrap();
        let from_float: NodeId = serde_json::from_str("42.0").unwrap();
        let from_text: NodeId = serde_json::from_str("\" 42 \"").unwrap();

        assert_eq!(from_int, NodeId::from("42"));
        assert_eq!(from_float, from_int);
        assert_eq!(from_text, from_int);
    }

    #[test]
    fn test_non_integral_float_keeps_fraction() {
        let id: EdgeId = serde_json::from_str("1.5").unwrap();
        assert_eq!(id.as_str(), "1.5");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&DocumentId::from(7)).unwrap();
        assert_eq!(json, "\"7\"");
    }
}
