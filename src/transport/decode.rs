use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{
    ConversionError, Decimal, EnumSet, EnumValue, FieldDescriptor, FieldKind, FieldPath, FieldValue, Model,
    PrimitiveType, Schema,
};

/// Decode a raw JSON object into a model instance of `schema`.
///
/// Decoding is all-or-nothing. Keys the schema does not declare are ignored.
pub fn decode(schema: &Arc<Schema>, raw: &Value) -> Result<Model, ConversionError> {
    decode_at(schema, raw, &FieldPath::root())
}

pub(crate) fn decode_at(
    schema: &Arc<Schema>,
    raw: &Value,
    path: &FieldPath,
) -> Result<Model, ConversionError> {
    let Value::Object(object) = raw else {
        return Err(mismatch(path, "object", raw));
    };

    let mut model = Model::empty(Arc::clone(schema));
    for field in schema.fields() {
        let field_path = path.key(field.wire_key());
        match object.get(field.wire_key()) {
            None if field.is_required() => {
                return Err(ConversionError::MissingRequiredField {
                    field: field_path.to_string(),
                });
            }
            None => {}
            Some(value) => {
                let value = decode_field(field, value, &field_path)?;
                model.insert_checked(field, value);
            }
        }
    }

    if tracing::enabled!(tracing::Level::TRACE) {
        for key in object.keys() {
            if !schema.has_wire_key(key) {
                tracing::trace!(schema = schema.name(), key = %key, "ignoring unmodeled field");
            }
        }
    }

    Ok(model)
}

/// Coerce one raw value for `field`, applying its null policy.
pub(crate) fn decode_field(
    field: &FieldDescriptor,
    raw: &Value,
    path: &FieldPath,
) -> Result<FieldValue, ConversionError> {
    if raw.is_null() {
        if field.is_nullable() {
            return Ok(FieldValue::Null);
        }
        return Err(ConversionError::UnexpectedNull {
            field: path.to_string(),
        });
    }
    coerce(field.kind(), raw, path)
}

fn coerce(kind: &FieldKind, raw: &Value, path: &FieldPath) -> Result<FieldValue, ConversionError> {
    match kind {
        FieldKind::Primitive(primitive) => coerce_primitive(*primitive, raw, path),
        FieldKind::Model(schema) => decode_at(schema, raw, path).map(FieldValue::Model),
        FieldKind::Enum(set) => coerce_enum(set, raw, path),
        FieldKind::List(element) => {
            let Value::Array(items) = raw else {
                return Err(mismatch(path, "array", raw));
            };
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| coerce_element(element, item, &path.index(idx)))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List)
        }
        FieldKind::Map(element) => {
            let Value::Object(entries) = raw else {
                return Err(mismatch(path, "object", raw));
            };
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), coerce_element(element, item, &path.key(key))?)))
                .collect::<Result<BTreeMap<_, _>, ConversionError>>()
                .map(FieldValue::Map)
        }
        FieldKind::Union(variants) => variants
            .iter()
            .find_map(|variant| coerce(variant, raw, path).ok())
            .ok_or_else(|| ConversionError::NoMatchingVariant {
                field: path.to_string(),
            }),
    }
}

// List and map elements have no null policy of their own.
fn coerce_element(
    kind: &FieldKind,
    raw: &Value,
    path: &FieldPath,
) -> Result<FieldValue, ConversionError> {
    if raw.is_null() {
        return Err(ConversionError::UnexpectedNull {
            field: path.to_string(),
        });
    }
    coerce(kind, raw, path)
}

fn coerce_primitive(
    primitive: PrimitiveType,
    raw: &Value,
    path: &FieldPath,
) -> Result<FieldValue, ConversionError> {
    let expected = primitive.as_str();
    match (primitive, raw) {
        (PrimitiveType::String, Value::String(value)) => Ok(FieldValue::String(value.clone())),
        (PrimitiveType::Integer, Value::Number(number)) => number
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or_else(|| mismatch(path, expected, raw)),
        (PrimitiveType::Float, Value::Number(number)) => number
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| mismatch(path, expected, raw)),
        (PrimitiveType::Boolean, Value::Bool(value)) => Ok(FieldValue::Boolean(*value)),
        (PrimitiveType::DateTime, Value::String(value)) => DateTime::parse_from_rfc3339(value)
            .map(|parsed| FieldValue::DateTime(parsed.with_timezone(&Utc)))
            .map_err(|_| ConversionError::TypeMismatch {
                field: path.to_string(),
                expected,
                found: "non-RFC 3339 string",
            }),
        (PrimitiveType::Decimal, Value::String(value)) => {
            Ok(FieldValue::Decimal(Decimal::new(value.as_str())))
        }
        (PrimitiveType::Decimal, Value::Number(number)) => {
            Ok(FieldValue::Decimal(Decimal::from_number(number.clone())))
        }
        (PrimitiveType::Json, value) => Ok(FieldValue::Json(value.clone())),
        _ => Err(mismatch(path, expected, raw)),
    }
}

fn coerce_enum(set: &EnumSet, raw: &Value, path: &FieldPath) -> Result<FieldValue, ConversionError> {
    let member = match raw {
        Value::String(value) => EnumValue::Str(value.clone()),
        Value::Number(number) => match number.as_i64() {
            Some(value) => EnumValue::Int(value),
            None => return Err(mismatch(path, "enum member", raw)),
        },
        _ => return Err(mismatch(path, "enum member", raw)),
    };
    if !set.contains(&member) {
        return Err(ConversionError::InvalidEnumValue {
            field: path.to_string(),
            value: member.to_string(),
            enum_name: set.name(),
        });
    }
    Ok(FieldValue::Enum(member))
}

fn mismatch(path: &FieldPath, expected: &'static str, raw: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        field: path.to_string(),
        expected,
        found: json_kind(raw),
    }
}

pub(crate) fn json_kind(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Model {
    /// Decode a raw JSON object; see [`decode`].
    pub fn decode(schema: &Arc<Schema>, raw: &Value) -> Result<Self, ConversionError> {
        decode(schema, raw)
    }

    /// Coerce a raw JSON value exactly as decoding would, then store it.
    ///
    /// On error the instance is left unchanged.
    pub fn set_raw(&mut self, key: &str, raw: &Value) -> Result<(), ConversionError> {
        let schema = Arc::clone(self.schema());
        let field = schema.field(key).ok_or_else(|| ConversionError::UnknownField {
            field: key.to_owned(),
        })?;
        let value = decode_field(field, raw, &FieldPath::root().key(field.wire_key()))?;
        self.insert_checked(field, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::FieldDescriptor;

    use super::*;

    fn item_schema() -> Arc<Schema> {
        Schema::builder("item")
            .field(FieldDescriptor::required("id", FieldKind::string()))
            .field(FieldDescriptor::optional("name", FieldKind::string()))
            .field(FieldDescriptor::optional("tags", FieldKind::list_of(FieldKind::string())))
            .build()
            .unwrap()
    }

    fn rich_schema() -> Arc<Schema> {
        let cost = Schema::builder("cost")
            .field(FieldDescriptor::required("amount", FieldKind::decimal()))
            .field(FieldDescriptor::required("currency", FieldKind::string()))
            .build()
            .unwrap();

        Schema::builder("rich")
            .field(FieldDescriptor::required("count", FieldKind::integer()))
            .field(FieldDescriptor::optional("ratio", FieldKind::float()))
            .field(FieldDescriptor::optional("enabled", FieldKind::boolean()))
            .field(FieldDescriptor::optional("created_at", FieldKind::date_time()))
            .field(FieldDescriptor::optional("cost", FieldKind::Model(cost)).nullable())
            .field(FieldDescriptor::optional(
                "direction",
                FieldKind::Enum(EnumSet::strings("direction", &["inbound", "outbound"])),
            ))
            .field(FieldDescriptor::optional(
                "labels",
                FieldKind::map_of(FieldKind::integer()),
            ))
            .field(FieldDescriptor::optional(
                "target",
                FieldKind::Union(vec![FieldKind::integer(), FieldKind::string()]),
            ))
            .field(FieldDescriptor::optional("payload", FieldKind::json()))
            .build()
            .unwrap()
    }

    #[test]
    fn decodes_minimal_object_leaving_optionals_unset() {
        let model = decode(&item_schema(), &json!({"id": "abc"})).unwrap();
        assert_eq!(model.get("id"), Some(&FieldValue::from("abc")));
        assert!(!model.is_set("name"));
        assert!(!model.is_set("tags"));
    }

    #[test]
    fn missing_required_field_fails_regardless_of_others() {
        let err = decode(&item_schema(), &json!({"name": "x", "tags": [1]})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingRequiredField {
                field: "id".to_owned()
            }
        );
    }

    #[test]
    fn non_object_root_is_a_type_mismatch() {
        let err = decode(&item_schema(), &json!(["id"])).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                field: String::new(),
                expected: "object",
                found: "array",
            }
        );
    }

    #[test]
    fn extra_keys_are_ignored() {
        let model = decode(&item_schema(), &json!({"id": "abc", "brand_new": {"x": 1}})).unwrap();
        assert_eq!(model.fields().count(), 1);
    }

    #[test]
    fn null_on_non_nullable_field_is_rejected() {
        let err = decode(&item_schema(), &json!({"id": "abc", "name": null})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnexpectedNull {
                field: "name".to_owned()
            }
        );
    }

    #[test]
    fn null_and_absent_are_distinguished_for_nullable_fields() {
        let schema = rich_schema();
        let with_null = decode(&schema, &json!({"count": 1, "cost": null})).unwrap();
        let absent = decode(&schema, &json!({"count": 1})).unwrap();

        assert!(with_null.is_null("cost"));
        assert!(!absent.is_set("cost"));
        assert_ne!(with_null, absent);
    }

    #[test]
    fn decodes_every_kind() {
        let model = decode(
            &rich_schema(),
            &json!({
                "count": 3,
                "ratio": 2,
                "enabled": true,
                "created_at": "2024-05-01T10:00:00+02:00",
                "cost": {"amount": 0.0040, "currency": "USD"},
                "direction": "outbound",
                "labels": {"a": 1, "b": 2},
                "target": "+13125550100",
                "payload": {"anything": [1, "two"]}
            }),
        )
        .unwrap();

        assert_eq!(model.get("count"), Some(&FieldValue::Integer(3)));
        assert_eq!(model.get("ratio"), Some(&FieldValue::Float(2.0)));
        assert_eq!(
            model.get("created_at").and_then(FieldValue::as_date_time),
            Some(
                DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc)
            )
        );
        let cost = model.get("cost").and_then(FieldValue::as_model).unwrap();
        assert_eq!(
            cost.get("amount"),
            Some(&FieldValue::Decimal(Decimal::from_number(
                serde_json::Number::from_f64(0.004).unwrap()
            )))
        );
        assert_eq!(cost.get("amount").and_then(FieldValue::as_str), Some("0.004"));
        assert_eq!(
            model.get("direction"),
            Some(&FieldValue::Enum(EnumValue::from("outbound")))
        );
        assert_eq!(
            model.get("labels").and_then(FieldValue::as_map).map(BTreeMap::len),
            Some(2)
        );
        assert_eq!(model.get("target"), Some(&FieldValue::from("+13125550100")));
        assert!(matches!(model.get("payload"), Some(FieldValue::Json(_))));
    }

    #[test]
    fn integer_field_rejects_fractional_numbers_and_strings() {
        let schema = rich_schema();
        let err = decode(&schema, &json!({"count": 1.5})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                field: "count".to_owned(),
                expected: "integer",
                found: "number",
            }
        );

        let err = decode(&schema, &json!({"count": "12"})).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn date_time_requires_rfc3339_string() {
        let schema = rich_schema();
        let err = decode(&schema, &json!({"count": 1, "created_at": 1714550400})).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));

        let err = decode(&schema, &json!({"count": 1, "created_at": "yesterday"})).unwrap_err();
        assert_eq!(err.field(), "created_at");
    }

    #[test]
    fn unknown_enum_member_is_rejected() {
        let err = decode(&rich_schema(), &json!({"count": 1, "direction": "sideways"})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidEnumValue {
                field: "direction".to_owned(),
                value: "sideways".to_owned(),
                enum_name: "direction",
            }
        );
    }

    #[test]
    fn union_tries_variants_in_declared_order() {
        let schema = rich_schema();
        let model = decode(&schema, &json!({"count": 1, "target": 42})).unwrap();
        assert_eq!(model.get("target"), Some(&FieldValue::Integer(42)));

        let err = decode(&schema, &json!({"count": 1, "target": [42]})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::NoMatchingVariant {
                field: "target".to_owned()
            }
        );
    }

    #[test]
    fn nested_errors_report_full_path() {
        let err = decode(
            &rich_schema(),
            &json!({"count": 1, "cost": {"amount": "1.00"}}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingRequiredField {
                field: "cost.currency".to_owned()
            }
        );

        let err = decode(&item_schema(), &json!({"id": "a", "tags": ["x", null]})).unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnexpectedNull {
                field: "tags[1]".to_owned()
            }
        );

        let err = decode(&rich_schema(), &json!({"count": 1, "labels": {"a": "one"}})).unwrap_err();
        assert_eq!(err.field(), "labels.a");
    }

    #[test]
    fn empty_list_is_distinct_from_absent() {
        let model = decode(&item_schema(), &json!({"id": "abc", "tags": []})).unwrap();
        assert_eq!(model.get("tags"), Some(&FieldValue::List(Vec::new())));
    }

    #[test]
    fn set_raw_coerces_like_decode() {
        let mut model = decode(&item_schema(), &json!({"id": "abc"})).unwrap();
        model.set_raw("tags", &json!(["a", "b"])).unwrap();
        assert_eq!(model.get("tags"), Some(&FieldValue::string_list(["a", "b"])));

        let err = model.set_raw("tags", &json!("a")).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
        assert_eq!(model.get("tags"), Some(&FieldValue::string_list(["a", "b"])));

        let err = model.set_raw("nope", &json!(1)).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownField { .. }));
    }
}
