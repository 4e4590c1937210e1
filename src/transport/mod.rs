//! Transport layer: wire-format details (JSON ⇄ model conversion, page envelopes).

mod decode;
mod encode;
mod errors;
mod page;

use crate::domain::ConversionError;

pub use decode::decode;
pub use encode::encode;
pub use errors::decode_error_body;
pub use page::{PageLayout, decode_data, decode_page, encode_page_query};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response does not match schema: {0}")]
    Conversion(#[from] ConversionError),
}
