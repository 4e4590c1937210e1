use std::sync::{Arc, LazyLock};

use url::Url;

use crate::domain::conversion::ConversionError;
use crate::domain::field::FieldValue;
use crate::domain::model::{Model, WireEnum};
use crate::domain::response::MessageType;
use crate::domain::schema::{FieldDescriptor, FieldKind, Schema};
use crate::domain::validation::ValidationError;
use crate::domain::value::{MessageText, PageNumber, PageSize, PhoneNumber};

pub const MMS_MAX_MEDIA_URLS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Paging and filtering for list endpoints.
///
/// `page_size` falls back to the client's configured default when unset.
pub struct ListParams {
    pub start: PageNumber,
    pub page_size: Option<PageSize>,
    filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(mut self, page: PageNumber) -> Self {
        self.start = page;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Add a `filter[<key>]=<value>` query parameter.
    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filters.push((format!("filter[{key}]"), value.into()));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub messaging_profile_id: Option<String>,
    pub webhook_url: Option<Url>,
    pub webhook_failover_url: Option<Url>,
    pub use_profile_webhooks: Option<bool>,
}

#[derive(Debug, Clone)]
/// Body of `POST /messages`.
pub struct SendMessage {
    from: PhoneNumber,
    to: PhoneNumber,
    text: Option<MessageText>,
    media_urls: Vec<Url>,
    options: SendOptions,
}

static SEND_MESSAGE_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("send_message")
        .field(FieldDescriptor::required("from", FieldKind::string()))
        .field(FieldDescriptor::required("to", FieldKind::string()))
        .field(FieldDescriptor::optional("text", FieldKind::string()))
        .field(FieldDescriptor::optional(
            "media_urls",
            FieldKind::list_of(FieldKind::string()),
        ))
        .field(FieldDescriptor::optional(
            "type",
            FieldKind::Enum(MessageType::enum_set()),
        ))
        .field(FieldDescriptor::optional("messaging_profile_id", FieldKind::string()))
        .field(FieldDescriptor::optional("webhook_url", FieldKind::string()))
        .field(FieldDescriptor::optional("webhook_failover_url", FieldKind::string()))
        .field(FieldDescriptor::optional("use_profile_webhooks", FieldKind::boolean()))
        .build_table()
});

impl SendMessage {
    /// Plain text message.
    pub fn sms(from: PhoneNumber, to: PhoneNumber, text: MessageText, options: SendOptions) -> Self {
        Self {
            from,
            to,
            text: Some(text),
            media_urls: Vec::new(),
            options,
        }
    }

    /// Multimedia message; `text` is an optional caption.
    pub fn mms(
        from: PhoneNumber,
        to: PhoneNumber,
        text: Option<MessageText>,
        media_urls: Vec<Url>,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        if media_urls.is_empty() {
            return Err(ValidationError::Empty {
                field: "media_urls",
            });
        }
        if media_urls.len() > MMS_MAX_MEDIA_URLS {
            return Err(ValidationError::TooMany {
                field: "media_urls",
                max: MMS_MAX_MEDIA_URLS,
                actual: media_urls.len(),
            });
        }
        Ok(Self {
            from,
            to,
            text,
            media_urls,
            options,
        })
    }

    pub fn schema() -> Arc<Schema> {
        SEND_MESSAGE_SCHEMA.clone()
    }

    pub fn from(&self) -> &PhoneNumber {
        &self.from
    }

    pub fn to(&self) -> &PhoneNumber {
        &self.to
    }

    pub fn text(&self) -> Option<&MessageText> {
        self.text.as_ref()
    }

    pub fn media_urls(&self) -> &[Url] {
        &self.media_urls
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }

    pub fn message_type(&self) -> MessageType {
        if self.media_urls.is_empty() {
            MessageType::Sms
        } else {
            MessageType::Mms
        }
    }

    /// Request body as a model; phone numbers go out in E.164.
    pub fn to_model(&self) -> Result<Model, ConversionError> {
        let options = &self.options;
        Model::builder(Self::schema())
            .set("from", self.from.e164())
            .set("to", self.to.e164())
            .set_opt("text", self.text.as_ref().map(MessageText::as_str))
            .set_opt(
                "media_urls",
                (!self.media_urls.is_empty())
                    .then(|| FieldValue::string_list(self.media_urls.iter().map(Url::as_str))),
            )
            .set("type", self.message_type().to_field())
            .set_opt("messaging_profile_id", options.messaging_profile_id.clone())
            .set_opt("webhook_url", options.webhook_url.as_ref().map(Url::as_str))
            .set_opt(
                "webhook_failover_url",
                options.webhook_failover_url.as_ref().map(Url::as_str),
            )
            .set_opt("use_profile_webhooks", options.use_profile_webhooks)
            .build()
    }
}
