use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::domain::{ConversionError, EnumValue, FieldPath, FieldValue, Model};

/// Encode a model instance into a raw JSON object.
///
/// Only set fields are emitted; an explicit null is written only for fields
/// that were set to null. Fails if a required field (at any depth) is unset.
pub fn encode(model: &Model) -> Result<Value, ConversionError> {
    encode_at(model, &FieldPath::root())
}

fn encode_at(model: &Model, path: &FieldPath) -> Result<Value, ConversionError> {
    model.validate_at(path)?;

    let mut object = Map::new();
    for (field, value) in model.fields() {
        let encoded = encode_value(value, &path.key(field.wire_key()))?;
        object.insert(field.wire_key().to_owned(), encoded);
    }
    Ok(Value::Object(object))
}

fn encode_value(value: &FieldValue, path: &FieldPath) -> Result<Value, ConversionError> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::String(value) => Value::String(value.clone()),
        FieldValue::Decimal(value) => value.to_json(),
        FieldValue::Integer(value) => Value::Number(Number::from(*value)),
        FieldValue::Float(value) => Number::from_f64(*value).map(Value::Number).ok_or_else(|| {
            ConversionError::TypeMismatch {
                field: path.to_string(),
                expected: "finite number",
                found: "non-finite number",
            }
        })?,
        FieldValue::Boolean(value) => Value::Bool(*value),
        FieldValue::DateTime(value) => {
            Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        FieldValue::Json(value) => value.clone(),
        FieldValue::Enum(EnumValue::Str(value)) => Value::String(value.clone()),
        FieldValue::Enum(EnumValue::Int(value)) => Value::Number(Number::from(*value)),
        FieldValue::Model(model) => encode_at(model, path)?,
        FieldValue::List(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| encode_value(item, &path.index(idx)))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        FieldValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), encode_value(item, &path.key(key))?)))
                .collect::<Result<Map<_, _>, ConversionError>>()?,
        ),
    })
}

impl Model {
    /// Encode this instance into a raw JSON object; see [`encode`].
    pub fn encode(&self) -> Result<Value, ConversionError> {
        encode(self)
    }
}
