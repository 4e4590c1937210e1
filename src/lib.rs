//! Typed core for a telecommunications REST API client.
//!
//! The crate has four layers: a domain layer of schemas, models and validated
//! values; a transport layer that converts JSON to and from models and decodes
//! page envelopes; pagination walkers that present multi-page collections as
//! one lazy sequence; and a small client layer orchestrating HTTP requests.
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use telapi::{Auth, ListParams, MessageText, PhoneNumber, SendMessage, SendOptions, TelApiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), telapi::TelApiError> {
//!     let client = TelApiClient::new(Auth::api_key("...")?)?;
//!
//!     let from = PhoneNumber::parse(None, "+18445550001")?;
//!     let to = PhoneNumber::parse(None, "+18665550001")?;
//!     let text = MessageText::new("hello")?;
//!     let message = client
//!         .send_message(SendMessage::sms(from, to, text, SendOptions::default()))
//!         .await?;
//!     println!("queued {}", message.id);
//!
//!     let mut numbers = client.list_phone_numbers(ListParams::new()).await?;
//!     while let Some(number) = numbers.next().await {
//!         println!("{}", number?.phone_number);
//!     }
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
pub mod pager;
mod transport;

pub use client::{
    Auth, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, ResourceStream,
    TelApiClient, TelApiClientBuilder, TelApiError,
};
pub use domain::{
    ApiErrorDetail, ApiKey, ConversionError, Decimal, EnumSet, EnumValue, FieldDescriptor, FieldKind,
    FieldPath, FieldValue, ListParams, Message, MessageId, MessageText, Model, Page, PageNumber,
    PageRequest, PageSize, PageTotal, PhoneNumber, PhoneNumberRecord, Resource, Schema,
    SchemaError, SendMessage, SendOptions, ValidationError,
};
pub use pager::{PageStream, Paginated};
pub use transport::{
    PageLayout, TransportError, decode, decode_data, decode_error_body, decode_page, encode,
    encode_page_query,
};
