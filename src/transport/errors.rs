use serde::Deserialize;
use serde::de::Error as DeError;

use crate::domain::ApiErrorDetail;

/// Error code sent by the API as either a JSON string or a JSON number.
///
/// For numbers, the raw JSON token is kept as text so both shapes compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransportCode(String);

impl<'de> Deserialize<'de> for TransportCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw: Box<serde_json::value::RawValue> = Deserialize::deserialize(deserializer)?;
        let token = raw.get();

        match token.as_bytes().first().copied() {
            Some(b'"') => {
                let parsed = serde_json::from_str::<String>(token).map_err(D::Error::custom)?;
                Ok(Self(parsed))
            }
            Some(b'-' | b'0'..=b'9') => Ok(Self(token.to_owned())),
            _ => Err(D::Error::custom(
                "expected error code to be JSON string or number",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorsJsonResponse {
    #[serde(default)]
    errors: Vec<ErrorJson>,
}

#[derive(Debug, Deserialize)]
struct ErrorJson {
    #[serde(default)]
    code: Option<TransportCode>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    source: Option<ErrorSourceJson>,
}

#[derive(Debug, Deserialize)]
struct ErrorSourceJson {
    #[serde(default)]
    pointer: Option<String>,
    #[serde(default)]
    parameter: Option<String>,
}

/// Decode the `errors` array of a failed response.
///
/// Returns `None` when the body is not JSON or carries no errors, so the
/// caller can fall back to reporting the raw body.
pub fn decode_error_body(body: &str) -> Option<Vec<ApiErrorDetail>> {
    let parsed: ErrorsJsonResponse = serde_json::from_str(body).ok()?;
    if parsed.errors.is_empty() {
        return None;
    }
    Some(
        parsed
            .errors
            .into_iter()
            .map(|error| {
                let source = error
                    .source
                    .and_then(|source| source.pointer.or(source.parameter));
                ApiErrorDetail {
                    code: error.code.map(|code| code.0),
                    title: error.title,
                    detail: error.detail,
                    source,
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_string_and_numeric_codes() {
        let body = r#"
        {
          "errors": [
            {"code": "10007", "title": "Unexpected error", "detail": "An unexpected error occured."},
            {"code": 40300, "title": "Invalid 'to' address", "source": {"pointer": "/to"}}
          ]
        }
        "#;

        let errors = decode_error_body(body).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code.as_deref(), Some("10007"));
        assert_eq!(errors[0].title.as_deref(), Some("Unexpected error"));
        assert_eq!(errors[1].code.as_deref(), Some("40300"));
        assert_eq!(errors[1].source.as_deref(), Some("/to"));
    }

    #[test]
    fn parameter_source_is_used_without_pointer() {
        let body = r#"{"errors": [{"title": "Bad filter", "source": {"parameter": "filter[status]"}}]}"#;
        let errors = decode_error_body(body).unwrap();
        assert_eq!(errors[0].code, None);
        assert_eq!(errors[0].source.as_deref(), Some("filter[status]"));
    }

    #[test]
    fn non_json_or_empty_errors_yield_none() {
        assert!(decode_error_body("<html>bad gateway</html>").is_none());
        assert!(decode_error_body(r#"{"errors": []}"#).is_none());
        assert!(decode_error_body(r#"{"message": "nope"}"#).is_none());
    }

    #[test]
    fn rejects_non_scalar_codes() {
        assert!(decode_error_body(r#"{"errors": [{"code": {"x": 1}}]}"#).is_none());
    }
}
