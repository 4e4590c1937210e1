use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::conversion::{ConversionError, FieldPath};
use crate::domain::field::{Decimal, EnumValue, FieldValue};
use crate::domain::schema::{EnumSet, FieldDescriptor, Schema};

#[derive(Debug, Clone)]
/// Runtime value conforming to a [`Schema`].
///
/// Fields are keyed by wire key. An unset field is absent; a field explicitly
/// set to null holds [`FieldValue::Null`]. Every stored value has been checked
/// against its descriptor, so an instance can only be invalid by missing a
/// required field (see [`Model::validate`]).
pub struct Model {
    schema: Arc<Schema>,
    values: BTreeMap<&'static str, FieldValue>,
}

impl Model {
    /// Create an instance with every field unset.
    ///
    /// Required fields must be filled before the instance is encoded.
    pub fn empty(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Start bulk construction; required fields are enforced by [`ModelBuilder::build`].
    pub fn builder(schema: Arc<Schema>) -> ModelBuilder {
        ModelBuilder {
            model: Self::empty(schema),
            error: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Value of a set field, addressed by wire key or in-memory name.
    ///
    /// Returns `None` both for unset fields and for keys the schema does not declare.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        let field = self.schema.field(key)?;
        self.values.get(field.wire_key())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_null(&self, key: &str) -> bool {
        self.get(key).is_some_and(FieldValue::is_null)
    }

    /// Set fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> + '_ {
        self.schema
            .fields()
            .iter()
            .filter_map(|field| self.values.get(field.wire_key()).map(|value| (field, value)))
    }

    /// Validate and store one field; on error the instance is left unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) -> Result<(), ConversionError> {
        let value = value.into();
        let field = self.descriptor(key)?;
        field.check(&FieldPath::root().key(field.wire_key()), &value)?;
        let wire_key = field.wire_key();
        self.values.insert(wire_key, value);
        Ok(())
    }

    /// Copy of this instance with one field changed; `self` is untouched.
    pub fn with_field(&self, key: &str, value: impl Into<FieldValue>) -> Result<Self, ConversionError> {
        let mut copy = self.clone();
        copy.set(key, value)?;
        Ok(copy)
    }

    /// Return an optional field to the unset state.
    pub fn unset(&mut self, key: &str) -> Result<Option<FieldValue>, ConversionError> {
        let field = self.descriptor(key)?;
        if field.is_required() {
            return Err(ConversionError::MissingRequiredField {
                field: field.wire_key().to_owned(),
            });
        }
        let wire_key = field.wire_key();
        Ok(self.values.remove(wire_key))
    }

    /// Check that every required field is set, recursively.
    pub fn validate(&self) -> Result<(), ConversionError> {
        self.validate_at(&FieldPath::root())
    }

    pub(crate) fn validate_at(&self, path: &FieldPath) -> Result<(), ConversionError> {
        for field in self.schema.fields() {
            if field.is_required() && !self.values.contains_key(field.wire_key()) {
                return Err(ConversionError::MissingRequiredField {
                    field: path.key(field.wire_key()).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Store a value the decoder has already coerced against `field`.
    pub(crate) fn insert_checked(&mut self, field: &FieldDescriptor, value: FieldValue) {
        self.values.insert(field.wire_key(), value);
    }

    /// Typed read of a required field.
    pub fn required<T: FromField>(&self, key: &str) -> Result<T, ConversionError> {
        let field = self.descriptor(key)?;
        let path = FieldPath::root().key(field.wire_key());
        match self.values.get(field.wire_key()) {
            None => Err(ConversionError::MissingRequiredField {
                field: path.to_string(),
            }),
            Some(FieldValue::Null) => Err(ConversionError::UnexpectedNull {
                field: path.to_string(),
            }),
            Some(value) => T::from_field(&path, value),
        }
    }

    /// Typed read of an optional field; unset and null both read as `None`.
    pub fn optional<T: FromField>(&self, key: &str) -> Result<Option<T>, ConversionError> {
        let field = self.descriptor(key)?;
        let path = FieldPath::root().key(field.wire_key());
        match self.values.get(field.wire_key()) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(value) => T::from_field(&path, value).map(Some),
        }
    }

    fn descriptor(&self, key: &str) -> Result<&FieldDescriptor, ConversionError> {
        self.schema
            .field(key)
            .ok_or_else(|| ConversionError::UnknownField {
                field: key.to_owned(),
            })
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

#[derive(Debug)]
/// Bulk constructor for [`Model`]; the first failing `set` is reported by `build`.
pub struct ModelBuilder {
    model: Model,
    error: Option<ConversionError>,
}

impl ModelBuilder {
    pub fn set(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.model.set(key, value) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Set the field only when `value` is `Some`; `None` leaves it unset.
    pub fn set_opt<V: Into<FieldValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub fn build(self) -> Result<Model, ConversionError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.model.validate()?;
        Ok(self.model)
    }
}

/// Typed struct backed by an explicit schema table.
pub trait Resource: Sized {
    fn schema() -> Arc<Schema>;

    fn from_model(model: &Model) -> Result<Self, ConversionError>;

    fn to_model(&self) -> Result<Model, ConversionError>;
}

/// Closed set of string values mapped onto a Rust enum.
pub trait WireEnum: Sized + Copy + 'static {
    const NAME: &'static str;
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|member| member.as_str() == value)
    }

    /// Schema-side description of the permitted values.
    fn enum_set() -> EnumSet {
        let members: Vec<&str> = Self::ALL.iter().map(|member| member.as_str()).collect();
        EnumSet::strings(Self::NAME, &members)
    }

    fn to_field(self) -> FieldValue {
        FieldValue::Enum(EnumValue::Str(self.as_str().to_owned()))
    }
}

impl Model {
    /// Typed read of a required enum field.
    pub fn required_enum<E: WireEnum>(&self, key: &str) -> Result<E, ConversionError> {
        let raw = self.required::<String>(key)?;
        parse_wire_enum(key, &raw)
    }

    /// Typed read of an optional enum field; unset and null both read as `None`.
    pub fn optional_enum<E: WireEnum>(&self, key: &str) -> Result<Option<E>, ConversionError> {
        self.optional::<String>(key)?
            .map(|raw| parse_wire_enum(key, &raw))
            .transpose()
    }
}

fn parse_wire_enum<E: WireEnum>(key: &str, raw: &str) -> Result<E, ConversionError> {
    E::from_wire(raw).ok_or_else(|| ConversionError::InvalidEnumValue {
        field: key.to_owned(),
        value: raw.to_owned(),
        enum_name: E::NAME,
    })
}

/// Extraction of a Rust value out of a stored [`FieldValue`].
pub trait FromField: Sized {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError>;
}

fn mismatch(path: &FieldPath, expected: &'static str, value: &FieldValue) -> ConversionError {
    ConversionError::TypeMismatch {
        field: path.to_string(),
        expected,
        found: value.describe(),
    }
}

impl FromField for String {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch(path, "string", value))
    }
}

impl FromField for i64 {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value.as_i64().ok_or_else(|| mismatch(path, "integer", value))
    }
}

impl FromField for f64 {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value.as_f64().ok_or_else(|| mismatch(path, "number", value))
    }
}

impl FromField for bool {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value.as_bool().ok_or_else(|| mismatch(path, "boolean", value))
    }
}

impl FromField for DateTime<Utc> {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_date_time()
            .ok_or_else(|| mismatch(path, "date-time", value))
    }
}

impl FromField for Decimal {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_decimal()
            .cloned()
            .ok_or_else(|| mismatch(path, "decimal", value))
    }
}

impl FromField for EnumValue {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        match value {
            FieldValue::Enum(member) => Ok(member.clone()),
            other => Err(mismatch(path, "enum member", other)),
        }
    }
}

impl FromField for serde_json::Value {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        match value {
            FieldValue::Json(raw) => Ok(raw.clone()),
            other => Err(mismatch(path, "json value", other)),
        }
    }
}

impl FromField for Model {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        value
            .as_model()
            .cloned()
            .ok_or_else(|| mismatch(path, "object", value))
    }
}

impl<T: FromField> FromField for Vec<T> {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        let items = value.as_list().ok_or_else(|| mismatch(path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| T::from_field(&path.index(idx), item))
            .collect()
    }
}

impl<T: FromField> FromField for BTreeMap<String, T> {
    fn from_field(path: &FieldPath, value: &FieldValue) -> Result<Self, ConversionError> {
        let entries = value.as_map().ok_or_else(|| mismatch(path, "map", value))?;
        entries
            .iter()
            .map(|(key, item)| Ok((key.clone(), T::from_field(&path.key(key), item)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::schema::FieldKind;

    use super::*;

    fn contact_schema() -> Arc<Schema> {
        Schema::builder("contact")
            .field(FieldDescriptor::required("id", FieldKind::string()))
            .field(FieldDescriptor::optional("name", FieldKind::string()))
            .field(FieldDescriptor::optional("note", FieldKind::string()).nullable())
            .field(
                FieldDescriptor::optional(
                    "status",
                    FieldKind::Enum(EnumSet::strings("status", &["active", "disabled"])),
                )
                .named("state"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn set_validates_kind_and_leaves_instance_unchanged_on_error() {
        let mut model = Model::empty(contact_schema());
        model.set("id", "abc").unwrap();

        let err = model.set("id", 5_i64).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
        assert_eq!(model.get("id"), Some(&FieldValue::from("abc")));
    }

    #[test]
    fn set_rejects_null_on_non_nullable_field() {
        let mut model = Model::empty(contact_schema());
        let err = model.set("name", FieldValue::Null).unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnexpectedNull {
                field: "name".to_owned()
            }
        );
        assert!(!model.is_set("name"));

        model.set("note", FieldValue::Null).unwrap();
        assert!(model.is_null("note"));
    }

    #[test]
    fn set_checks_enum_membership_and_accepts_field_name() {
        let mut model = Model::empty(contact_schema());
        model.set("state", EnumValue::from("active")).unwrap();
        assert_eq!(
            model.get("status"),
            Some(&FieldValue::Enum(EnumValue::from("active")))
        );

        let err = model.set("status", EnumValue::from("gone")).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidEnumValue { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut model = Model::empty(contact_schema());
        let err = model.set("nickname", "x").unwrap_err();
        assert_eq!(
            err,
            ConversionError::UnknownField {
                field: "nickname".to_owned()
            }
        );
    }

    #[test]
    fn with_field_does_not_mutate_original() {
        let original = Model::builder(contact_schema())
            .set("id", "abc")
            .set("name", "first")
            .build()
            .unwrap();

        let derived = original.with_field("name", "second").unwrap();
        assert_eq!(original.get("name"), Some(&FieldValue::from("first")));
        assert_eq!(derived.get("name"), Some(&FieldValue::from("second")));
        assert_eq!(derived.get("id"), original.get("id"));
        assert_ne!(original, derived);
    }

    #[test]
    fn builder_enforces_required_fields() {
        let err = Model::builder(contact_schema())
            .set("name", "x")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingRequiredField {
                field: "id".to_owned()
            }
        );
    }

    #[test]
    fn builder_reports_first_set_error() {
        let err = Model::builder(contact_schema())
            .set("id", true)
            .set("name", 1_i64)
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "id");
    }

    #[test]
    fn unset_only_applies_to_optional_fields() {
        let mut model = Model::builder(contact_schema())
            .set("id", "abc")
            .set("name", "x")
            .build()
            .unwrap();

        assert_eq!(model.unset("name").unwrap(), Some(FieldValue::from("x")));
        assert!(!model.is_set("name"));
        assert!(model.unset("id").is_err());
        assert!(model.is_set("id"));
    }

    #[test]
    fn typed_reads_distinguish_missing_and_null() {
        let model = Model::builder(contact_schema())
            .set("id", "abc")
            .set("note", FieldValue::Null)
            .build()
            .unwrap();

        assert_eq!(model.required::<String>("id").unwrap(), "abc");
        assert_eq!(model.optional::<String>("note").unwrap(), None);
        assert_eq!(model.optional::<String>("name").unwrap(), None);
        assert!(model.required::<i64>("id").is_err());
    }

    #[test]
    fn fields_iterate_in_schema_order() {
        let model = Model::builder(contact_schema())
            .set("note", "n")
            .set("id", "abc")
            .build()
            .unwrap();
        let keys: Vec<_> = model.fields().map(|(field, _)| field.wire_key()).collect();
        assert_eq!(keys, vec!["id", "note"]);
    }

    #[test]
    fn nested_model_must_satisfy_its_required_fields() {
        let inner = contact_schema();
        let outer = Schema::builder("wrapper")
            .field(FieldDescriptor::required("contact", FieldKind::Model(inner.clone())))
            .build()
            .unwrap();

        let mut model = Model::empty(outer);
        let err = model.set("contact", Model::empty(inner)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingRequiredField {
                field: "contact.id".to_owned()
            }
        );
    }
}
