use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field map of a document.
pub type Fields = BTreeMap<String, Value>;

/// A typed Firestore value, serialized exactly as the REST API expects it:
/// `{"stringValue": "..."}`, `{"integerValue": "42"}`, ...
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(#[serde(with = "int64")] i64),
    DoubleValue(f64),
    TimestampValue(DateTime<Utc>),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(GeoPoint),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(n) => Some(*n),
            _ => None,
        }
    }

    /// Timestamps written by the web SDK come back as `timestampValue`; older
    /// documents stored the date as an RFC 3339 string.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(at) => Some(*at),
            Self::StringValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|at| at.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::ArrayValue(array) => Some(&array.values),
            _ => None,
        }
    }

    /// An array of string values.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ArrayValue(ArrayValue {
            values: items.into_iter().map(|s| Self::StringValue(s.into())).collect(),
        })
    }

    /// Drop the type tags: `{"stringValue": "a"}` becomes `"a"`, maps and arrays
    /// are converted recursively.
    pub fn to_plain(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::NullValue(()) => Json::Null,
            Self::BooleanValue(b) => Json::Bool(*b),
            Self::IntegerValue(n) => Json::from(*n),
            Self::DoubleValue(d) => serde_json::Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Self::TimestampValue(at) => Json::String(at.to_rfc3339()),
            Self::StringValue(s) | Self::BytesValue(s) | Self::ReferenceValue(s) => Json::String(s.clone()),
            Self::GeoPointValue(point) => serde_json::json!({
                "latitude": point.latitude,
                "longitude": point.longitude,
            }),
            Self::ArrayValue(array) => Json::Array(array.values.iter().map(Self::to_plain).collect()),
            Self::MapValue(map) => Json::Object(plain_fields(&map.fields)),
        }
    }
}

pub(crate) fn plain_fields(fields: &Fields) -> serde_json::Map<String, serde_json::Value> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_plain())).collect()
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::StringValue(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::StringValue(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::IntegerValue(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::BooleanValue(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(at: DateTime<Utc>) -> Self {
        Self::TimestampValue(at)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Self::MapValue(MapValue { fields })
    }
}

/// Firestore sends 64 bit integers as decimal strings.
mod int64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(i64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(D::Error::custom),
            Repr::Number(n) => Ok(n),
        }
    }
}
