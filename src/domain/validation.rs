use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidPhoneNumber { input: String },
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        actual: u32,
    },
    TooMany {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                write!(f, "{field} out of range: {actual} (expected {min}..={max})")
            }
            Self::TooMany { field, max, actual } => {
                write!(f, "too many {field}: {actual} (max {max})")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty { field: "to" };
        assert_eq!(err.to_string(), "to must not be empty");

        let err = ValidationError::InvalidPhoneNumber {
            input: "bad".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid phone number: bad");

        let err = ValidationError::OutOfRange {
            field: "page[size]",
            min: 1,
            max: 250,
            actual: 251,
        };
        assert_eq!(
            err.to_string(),
            "page[size] out of range: 251 (expected 1..=250)"
        );

        let err = ValidationError::TooMany {
            field: "media_urls",
            max: 10,
            actual: 11,
        };
        assert_eq!(err.to_string(), "too many media_urls: 11 (max 10)");
    }
}
