use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::domain::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Member of an [`EnumSet`](crate::domain::EnumSet).
pub enum EnumValue {
    Str(String),
    Int(i64),
}

impl EnumValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for EnumValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Money-like amount kept as received.
///
/// The text is never reparsed. An amount that arrived as a JSON number is
/// encoded back as a number, one that arrived as a string as a string.
pub struct Decimal {
    text: String,
    number: Option<Number>,
}

impl Decimal {
    /// Decimal carried on the wire as a JSON string.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            number: None,
        }
    }

    /// Decimal carried on the wire as a JSON number.
    pub fn from_number(number: Number) -> Self {
        Self {
            text: number.to_string(),
            number: Some(number),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_numeric(&self) -> bool {
        self.number.is_some()
    }

    pub(crate) fn to_json(&self) -> Value {
        match &self.number {
            Some(number) => Value::Number(number.clone()),
            None => Value::String(self.text.clone()),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Decimal {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Decimal {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Typed value held by a set field of a [`Model`].
///
/// An unset field has no `FieldValue` at all; [`FieldValue::Null`] is an
/// explicit JSON `null` on a nullable field.
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Decimal(Decimal),
    Json(Value),
    Enum(EnumValue),
    Model(Model),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Shape name used in type mismatch errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::DateTime(_) => "date-time",
            Self::Decimal(_) => "decimal",
            Self::Json(_) => "json value",
            Self::Enum(_) => "enum member",
            Self::Model(_) => "object",
            Self::List(_) => "array",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Decimal(value) => Some(value.as_str()),
            Self::Enum(value) => value.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) | Self::Enum(EnumValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Self::Decimal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// List of plain strings, the most common list shape in the API.
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|item| Self::String(item.into())).collect())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<EnumValue> for FieldValue {
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

impl From<Model> for FieldValue {
    fn from(value: Model) -> Self {
        Self::Model(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    /// `None` maps to an explicit null.
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
