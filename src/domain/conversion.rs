use std::fmt;

/// Errors raised while converting between raw JSON and model instances.
///
/// `field` is the dotted path of the offending value (`data.tags[2]`); it is
/// empty when the failure concerns the root value itself.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: String },

    #[error("field `{field}` must not be null")]
    UnexpectedNull { field: String },

    #[error("type mismatch at `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid value `{value}` for enum {enum_name} at `{field}`")]
    InvalidEnumValue {
        field: String,
        value: String,
        enum_name: &'static str,
    },

    #[error("no union variant accepted the value at `{field}`")]
    NoMatchingVariant { field: String },

    #[error("schema does not declare field `{field}`")]
    UnknownField { field: String },
}

impl ConversionError {
    /// Path of the value that failed to convert.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingRequiredField { field }
            | Self::UnexpectedNull { field }
            | Self::TypeMismatch { field, .. }
            | Self::InvalidEnumValue { field, .. }
            | Self::NoMatchingVariant { field }
            | Self::UnknownField { field } => field,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Location of a value inside a decoded document, used for error reporting.
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_owned())
        } else {
            Self(format!("{}.{key}", self.0))
        }
    }

    pub fn index(&self, idx: usize) -> Self {
        Self(format!("{}[{idx}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
