use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::domain::conversion::{ConversionError, FieldPath};
use crate::domain::field::{EnumValue, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Scalar shapes a field can take on the wire.
pub enum PrimitiveType {
    String,
    /// JSON integer that fits in `i64`.
    Integer,
    /// Any JSON number; integers widen to `f64`.
    Float,
    Boolean,
    /// RFC 3339 string decoded into a UTC timestamp.
    DateTime,
    /// Money-like amount sent either as a JSON string or a JSON number.
    ///
    /// The textual form is kept and re-encoded as a string.
    Decimal,
    /// Free-form JSON payload kept as-is.
    Json,
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::DateTime => "date-time string",
            Self::Decimal => "decimal",
            Self::Json => "json value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Closed, named set of permitted enum members.
pub struct EnumSet {
    name: &'static str,
    members: Vec<EnumValue>,
}

impl EnumSet {
    /// Enum whose members are strings (the common case).
    pub fn strings(name: &'static str, members: &[&str]) -> Self {
        Self {
            name,
            members: members
                .iter()
                .map(|member| EnumValue::Str((*member).to_owned()))
                .collect(),
        }
    }

    /// Enum whose members are integers.
    pub fn integers(name: &'static str, members: &[i64]) -> Self {
        Self {
            name,
            members: members.iter().copied().map(EnumValue::Int).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> &[EnumValue] {
        &self.members
    }

    pub fn contains(&self, value: &EnumValue) -> bool {
        self.members.contains(value)
    }
}

#[derive(Debug, Clone)]
/// Value shape of a field.
pub enum FieldKind {
    Primitive(PrimitiveType),
    Model(Arc<Schema>),
    Enum(EnumSet),
    List(Box<FieldKind>),
    /// String-keyed map with homogeneous values.
    Map(Box<FieldKind>),
    /// Alternatives tried in declared order.
    Union(Vec<FieldKind>),
}

impl FieldKind {
    pub fn string() -> Self {
        Self::Primitive(PrimitiveType::String)
    }

    pub fn integer() -> Self {
        Self::Primitive(PrimitiveType::Integer)
    }

    pub fn float() -> Self {
        Self::Primitive(PrimitiveType::Float)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    pub fn date_time() -> Self {
        Self::Primitive(PrimitiveType::DateTime)
    }

    pub fn decimal() -> Self {
        Self::Primitive(PrimitiveType::Decimal)
    }

    pub fn json() -> Self {
        Self::Primitive(PrimitiveType::Json)
    }

    pub fn list_of(element: FieldKind) -> Self {
        Self::List(Box::new(element))
    }

    pub fn map_of(value: FieldKind) -> Self {
        Self::Map(Box::new(value))
    }

    /// Human-readable description used in type mismatch errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Primitive(primitive) => primitive.as_str(),
            Self::Model(_) => "object",
            Self::Enum(_) => "enum member",
            Self::List(_) => "array",
            Self::Map(_) => "object",
            Self::Union(_) => "union variant",
        }
    }

    /// Check that an already-typed value conforms to this kind.
    ///
    /// `Null` is never accepted here; nullability is a property of the field,
    /// not of the kind, and is handled by the caller.
    pub fn check(&self, path: &FieldPath, value: &FieldValue) -> Result<(), ConversionError> {
        match (self, value) {
            (Self::Primitive(expected), value) => check_primitive(*expected, path, value),
            (Self::Model(schema), FieldValue::Model(model)) => {
                if !Arc::ptr_eq(model.schema(), schema) {
                    return Err(ConversionError::TypeMismatch {
                        field: path.to_string(),
                        expected: "object",
                        found: "object of another schema",
                    });
                }
                model.validate_at(path)
            }
            (Self::Enum(set), FieldValue::Enum(member)) => {
                if set.contains(member) {
                    Ok(())
                } else {
                    Err(ConversionError::InvalidEnumValue {
                        field: path.to_string(),
                        value: member.to_string(),
                        enum_name: set.name(),
                    })
                }
            }
            (Self::List(element), FieldValue::List(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(idx, item)| check_element(element, &path.index(idx), item)),
            (Self::Map(element), FieldValue::Map(entries)) => entries
                .iter()
                .try_for_each(|(key, item)| check_element(element, &path.key(key), item)),
            (Self::Union(variants), value) => {
                if variants.iter().any(|variant| variant.check(path, value).is_ok()) {
                    Ok(())
                } else {
                    Err(ConversionError::NoMatchingVariant {
                        field: path.to_string(),
                    })
                }
            }
            (kind, value) => Err(ConversionError::TypeMismatch {
                field: path.to_string(),
                expected: kind.describe(),
                found: value.describe(),
            }),
        }
    }
}

fn check_element(kind: &FieldKind, path: &FieldPath, value: &FieldValue) -> Result<(), ConversionError> {
    if value.is_null() {
        return Err(ConversionError::UnexpectedNull {
            field: path.to_string(),
        });
    }
    kind.check(path, value)
}

fn check_primitive(
    expected: PrimitiveType,
    path: &FieldPath,
    value: &FieldValue,
) -> Result<(), ConversionError> {
    let ok = matches!(
        (expected, value),
        (PrimitiveType::String, FieldValue::String(_))
            | (PrimitiveType::Integer, FieldValue::Integer(_))
            | (PrimitiveType::Float, FieldValue::Float(_))
            | (PrimitiveType::Boolean, FieldValue::Boolean(_))
            | (PrimitiveType::DateTime, FieldValue::DateTime(_))
            | (PrimitiveType::Decimal, FieldValue::Decimal(_))
            | (PrimitiveType::Json, FieldValue::Json(_))
    );
    if ok {
        Ok(())
    } else {
        Err(ConversionError::TypeMismatch {
            field: path.to_string(),
            expected: expected.as_str(),
            found: value.describe(),
        })
    }
}

#[derive(Debug, Clone)]
/// One property of a model schema.
pub struct FieldDescriptor {
    name: &'static str,
    wire_key: &'static str,
    presence: Presence,
    nullable: bool,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Required, non-nullable field whose in-memory name equals its wire key.
    pub fn required(wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name: wire_key,
            wire_key,
            presence: Presence::Required,
            nullable: false,
            kind,
        }
    }

    /// Optional, non-nullable field whose in-memory name equals its wire key.
    pub fn optional(wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            presence: Presence::Optional,
            ..Self::required(wire_key, kind)
        }
    }

    /// Accept an explicit JSON `null` as a value distinct from "absent".
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Use a different in-memory name than the wire key.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn wire_key(&self) -> &'static str {
        self.wire_key
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Validate a typed value for this field, including null handling.
    pub fn check(&self, path: &FieldPath, value: &FieldValue) -> Result<(), ConversionError> {
        if value.is_null() {
            if self.nullable {
                return Ok(());
            }
            return Err(ConversionError::UnexpectedNull {
                field: path.to_string(),
            });
        }
        self.kind.check(path, value)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema {schema} declares field {field} more than once")]
    DuplicateField {
        schema: &'static str,
        field: &'static str,
    },
}

#[derive(Debug)]
/// Ordered set of field descriptors with unique wire keys.
///
/// Schemas are immutable once built and shared behind an [`Arc`].
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    by_wire_key: HashMap<&'static str, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look a field up by wire key first, then by in-memory name.
    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_wire_key
            .get(key)
            .or_else(|| self.by_name.get(key))
            .and_then(|&idx| self.fields.get(idx))
    }

    pub fn has_wire_key(&self, key: &str) -> bool {
        self.by_wire_key.contains_key(key)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug)]
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Finish the schema, rejecting repeated wire keys or in-memory names.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        self.check_unique()?;
        Ok(self.finish())
    }

    /// Finish a static table declared in this crate.
    ///
    /// Uniqueness is a debug assertion here; the resource tests build every table.
    pub(crate) fn build_table(self) -> Arc<Schema> {
        debug_assert_eq!(self.check_unique(), Ok(()));
        self.finish()
    }

    fn check_unique(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            let renamed = field.name != field.wire_key;
            if !seen.insert(field.wire_key) || (renamed && !seen.insert(field.name)) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name,
                    field: field.wire_key,
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Arc<Schema> {
        let mut by_wire_key = HashMap::with_capacity(self.fields.len());
        let mut by_name = HashMap::with_capacity(self.fields.len());
        for (idx, field) in self.fields.iter().enumerate() {
            by_wire_key.entry(field.wire_key).or_insert(idx);
            by_name.entry(field.name).or_insert(idx);
        }
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            by_wire_key,
            by_name,
        })
    }
}
