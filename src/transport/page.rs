use std::sync::Arc;

use serde_json::Value;

use super::TransportError;
use super::decode::{decode_at, json_kind};
use crate::domain::{
    ConversionError, FieldPath, Model, Page, PageRequest, PageSize, PageTotal, Schema,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where a list endpoint puts its items and page metadata, and how it names
/// its paging query parameters.
///
/// The default matches the conventional envelope:
/// `{"data": [...], "meta": {"page_number", "page_size", "total_pages", "total_results"}}`
/// with `page[number]` / `page[size]` query parameters.
pub struct PageLayout {
    pub items_key: &'static str,
    /// `None` when the metadata keys sit next to the items.
    pub meta_key: Option<&'static str>,
    pub page_number_key: &'static str,
    pub page_size_key: &'static str,
    pub total_pages_key: Option<&'static str>,
    pub total_results_key: Option<&'static str>,
    /// Set for cursor-paginated endpoints.
    pub next_cursor_key: Option<&'static str>,
    pub page_number_param: &'static str,
    pub page_size_param: &'static str,
    pub cursor_param: &'static str,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            items_key: "data",
            meta_key: Some("meta"),
            page_number_key: "page_number",
            page_size_key: "page_size",
            total_pages_key: Some("total_pages"),
            total_results_key: Some("total_results"),
            next_cursor_key: None,
            page_number_param: "page[number]",
            page_size_param: "page[size]",
            cursor_param: "page[after]",
        }
    }
}

impl PageLayout {
    /// Layout for endpoints paginated by an opaque `after` cursor.
    pub fn cursor(next_cursor_key: &'static str) -> Self {
        Self {
            total_pages_key: None,
            total_results_key: None,
            next_cursor_key: Some(next_cursor_key),
            ..Self::default()
        }
    }
}

/// Query parameters selecting one page.
pub fn encode_page_query(
    layout: &PageLayout,
    request: &PageRequest,
    page_size: PageSize,
) -> Vec<(String, String)> {
    let selector = match request {
        PageRequest::Number(number) => (layout.page_number_param.to_owned(), number.to_string()),
        PageRequest::After(cursor) => (layout.cursor_param.to_owned(), cursor.clone()),
    };
    vec![
        selector,
        (
            layout.page_size_param.to_owned(),
            page_size.value().to_string(),
        ),
    ]
}

/// Decode a list response body into a page of models.
///
/// Metadata the server omits falls back to what was requested; totals that
/// are absent leave the page with [`PageTotal::Unknown`].
pub fn decode_page(
    layout: &PageLayout,
    schema: &Arc<Schema>,
    request: &PageRequest,
    page_size: PageSize,
    body: &str,
) -> Result<Page<Model>, TransportError> {
    let parsed: Value = serde_json::from_str(body)?;
    let root = FieldPath::root();
    let Value::Object(object) = &parsed else {
        return Err(ConversionError::TypeMismatch {
            field: root.to_string(),
            expected: "object",
            found: json_kind(&parsed),
        }
        .into());
    };

    let items_path = root.key(layout.items_key);
    let items = match object.get(layout.items_key) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ConversionError::TypeMismatch {
                field: items_path.to_string(),
                expected: "array",
                found: json_kind(other),
            }
            .into());
        }
        None => {
            return Err(ConversionError::MissingRequiredField {
                field: items_path.to_string(),
            }
            .into());
        }
    };
    let items = items
        .iter()
        .enumerate()
        .map(|(idx, item)| decode_at(schema, item, &items_path.index(idx)))
        .collect::<Result<Vec<_>, _>>()?;

    let (meta, meta_path) = match layout.meta_key {
        Some(key) => (object.get(key).and_then(Value::as_object), root.key(key)),
        None => (Some(object), root),
    };
    let read = |key: &str| -> Result<Option<u64>, ConversionError> {
        match meta.and_then(|meta| meta.get(key)) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| ConversionError::TypeMismatch {
                field: meta_path.key(key).to_string(),
                expected: "non-negative integer",
                found: json_kind(value),
            }),
        }
    };

    let requested_number = match request {
        PageRequest::Number(number) => *number,
        PageRequest::After(_) => 0,
    };
    let page_number = read(layout.page_number_key)?
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(requested_number);
    let page_size = read(layout.page_size_key)?
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(page_size.value());

    let total_pages = match layout.total_pages_key {
        Some(key) => read(key)?,
        None => None,
    };
    let total_results = match layout.total_results_key {
        Some(key) => read(key)?,
        None => None,
    };
    let total = match (total_pages, total_results) {
        (Some(pages), _) => PageTotal::Pages(u32::try_from(pages).unwrap_or(u32::MAX)),
        (None, Some(results)) => PageTotal::Results(results),
        (None, None) => PageTotal::Unknown,
    };

    let page = Page::new(items, page_number, page_size, total);
    let Some(cursor_key) = layout.next_cursor_key else {
        return Ok(page);
    };
    let next_cursor = meta
        .and_then(|meta| meta.get(cursor_key))
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_owned);

    Ok(page.with_cursor(next_cursor))
}

/// Decode a single-resource response wrapped in the `data` envelope.
pub fn decode_data(schema: &Arc<Schema>, body: &str) -> Result<Model, TransportError> {
    let parsed: Value = serde_json::from_str(body)?;
    let path = FieldPath::root().key("data");
    match parsed.get("data") {
        Some(data) => Ok(decode_at(schema, data, &path)?),
        None => Err(ConversionError::MissingRequiredField {
            field: path.to_string(),
        }
        .into()),
    }
}
