use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};

use crate::domain::conversion::ConversionError;
use crate::domain::field::{Decimal, EnumValue, FieldValue};
use crate::domain::model::{Model, Resource, WireEnum};
use crate::domain::schema::{EnumSet, FieldDescriptor, FieldKind, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
/// One entry of the `errors` array of a failed response.
pub struct ApiErrorDetail {
    pub code: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
    /// JSON pointer or query parameter the error refers to.
    pub source: Option<String>,
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{code}] ")?;
        }
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => write!(f, "{title}: {detail}")?,
            (Some(text), None) | (None, Some(text)) => f.write_str(text)?,
            (None, None) => f.write_str("unspecified error")?,
        }
        if let Some(source) = &self.source {
            write!(f, " (at {source})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl WireEnum for MessageDirection {
    const NAME: &'static str = "message_direction";
    const ALL: &'static [Self] = &[Self::Inbound, Self::Outbound];

    fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Sms,
    Mms,
}

impl WireEnum for MessageType {
    const NAME: &'static str = "message_type";
    const ALL: &'static [Self] = &[Self::Sms, Self::Mms];

    fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Mms => "MMS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Per-recipient delivery state of a message.
pub enum DeliveryStatus {
    Queued,
    Sending,
    Sent,
    Expired,
    SendingFailed,
    DeliveryUnconfirmed,
    Delivered,
    DeliveryFailed,
    Received,
}

impl DeliveryStatus {
    /// No further status updates are expected.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::SendingFailed
                | Self::Delivered
                | Self::DeliveryFailed
                | Self::DeliveryUnconfirmed
                | Self::Received
        )
    }
}

impl WireEnum for DeliveryStatus {
    const NAME: &'static str = "delivery_status";
    const ALL: &'static [Self] = &[
        Self::Queued,
        Self::Sending,
        Self::Sent,
        Self::Expired,
        Self::SendingFailed,
        Self::DeliveryUnconfirmed,
        Self::Delivered,
        Self::DeliveryFailed,
        Self::Received,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Expired => "expired",
            Self::SendingFailed => "sending_failed",
            Self::DeliveryUnconfirmed => "delivery_unconfirmed",
            Self::Delivered => "delivered",
            Self::DeliveryFailed => "delivery_failed",
            Self::Received => "received",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneNumberStatus {
    PurchasePending,
    PurchaseFailed,
    PortPending,
    PortFailed,
    Active,
    Deleted,
    EmergencyOnly,
    PortedOut,
    PortOutPending,
    ProvisionPending,
}

impl WireEnum for PhoneNumberStatus {
    const NAME: &'static str = "phone_number_status";
    const ALL: &'static [Self] = &[
        Self::PurchasePending,
        Self::PurchaseFailed,
        Self::PortPending,
        Self::PortFailed,
        Self::Active,
        Self::Deleted,
        Self::EmergencyOnly,
        Self::PortedOut,
        Self::PortOutPending,
        Self::ProvisionPending,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::PurchasePending => "purchase-pending",
            Self::PurchaseFailed => "purchase-failed",
            Self::PortPending => "port-pending",
            Self::PortFailed => "port-failed",
            Self::Active => "active",
            Self::Deleted => "deleted",
            Self::EmergencyOnly => "emergency-only",
            Self::PortedOut => "ported-out",
            Self::PortOutPending => "port-out-pending",
            Self::ProvisionPending => "provision-pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneNumberType {
    Local,
    TollFree,
    Mobile,
    National,
    SharedCost,
    Landline,
}

impl WireEnum for PhoneNumberType {
    const NAME: &'static str = "phone_number_type";
    const ALL: &'static [Self] = &[
        Self::Local,
        Self::TollFree,
        Self::Mobile,
        Self::National,
        Self::SharedCost,
        Self::Landline,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::TollFree => "toll_free",
            Self::Mobile => "mobile",
            Self::National => "national",
            Self::SharedCost => "shared_cost",
            Self::Landline => "landline",
        }
    }
}

fn record_type(name: &'static str) -> FieldKind {
    FieldKind::Enum(EnumSet::strings(name, &[name]))
}

fn to_models<R: Resource>(items: &[R]) -> Result<FieldValue, ConversionError> {
    items
        .iter()
        .map(|item| item.to_model().map(FieldValue::Model))
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::List)
}

fn from_models<R: Resource>(model: &Model, key: &str) -> Result<Vec<R>, ConversionError> {
    model
        .optional::<Vec<Model>>(key)?
        .unwrap_or_default()
        .iter()
        .map(R::from_model)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Sending side of a message.
pub struct MessageEndpoint {
    pub phone_number: String,
    pub carrier: Option<String>,
    pub line_type: Option<String>,
}

static MESSAGE_ENDPOINT_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("message_endpoint")
        .field(FieldDescriptor::required("phone_number", FieldKind::string()))
        .field(FieldDescriptor::optional("carrier", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("line_type", FieldKind::string()).nullable())
        .build_table()
});

impl Resource for MessageEndpoint {
    fn schema() -> Arc<Schema> {
        MESSAGE_ENDPOINT_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        Ok(Self {
            phone_number: model.required("phone_number")?,
            carrier: model.optional("carrier")?,
            line_type: model.optional("line_type")?,
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        Model::builder(Self::schema())
            .set("phone_number", self.phone_number.as_str())
            .set_opt("carrier", self.carrier.clone())
            .set_opt("line_type", self.line_type.clone())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One recipient of a message with its delivery state.
pub struct MessageRecipient {
    pub phone_number: String,
    pub status: DeliveryStatus,
    pub carrier: Option<String>,
    pub line_type: Option<String>,
}

static MESSAGE_RECIPIENT_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("message_recipient")
        .field(FieldDescriptor::required("phone_number", FieldKind::string()))
        .field(FieldDescriptor::required(
            "status",
            FieldKind::Enum(DeliveryStatus::enum_set()),
        ))
        .field(FieldDescriptor::optional("carrier", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("line_type", FieldKind::string()).nullable())
        .build_table()
});

impl Resource for MessageRecipient {
    fn schema() -> Arc<Schema> {
        MESSAGE_RECIPIENT_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        Ok(Self {
            phone_number: model.required("phone_number")?,
            status: model.required_enum("status")?,
            carrier: model.optional("carrier")?,
            line_type: model.optional("line_type")?,
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        Model::builder(Self::schema())
            .set("phone_number", self.phone_number.as_str())
            .set("status", self.status.to_field())
            .set_opt("carrier", self.carrier.clone())
            .set_opt("line_type", self.line_type.clone())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub url: String,
    pub content_type: Option<String>,
    pub size: Option<i64>,
}

static MEDIA_ITEM_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("media_item")
        .field(FieldDescriptor::required("url", FieldKind::string()))
        .field(FieldDescriptor::optional("content_type", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("size", FieldKind::integer()).nullable())
        .build_table()
});

impl Resource for MediaItem {
    fn schema() -> Arc<Schema> {
        MEDIA_ITEM_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        Ok(Self {
            url: model.required("url")?,
            content_type: model.optional("content_type")?,
            size: model.optional("size")?,
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        Model::builder(Self::schema())
            .set("url", self.url.as_str())
            .set_opt("content_type", self.content_type.clone())
            .set_opt("size", self.size)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Price of a message; `amount` keeps the decimal exactly as received.
pub struct Cost {
    pub amount: Decimal,
    pub currency: String,
}

static COST_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("cost")
        .field(FieldDescriptor::required("amount", FieldKind::decimal()))
        .field(FieldDescriptor::required("currency", FieldKind::string()))
        .build_table()
});

impl Resource for Cost {
    fn schema() -> Arc<Schema> {
        COST_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        Ok(Self {
            amount: model.required("amount")?,
            currency: model.required("currency")?,
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        Model::builder(Self::schema())
            .set("amount", self.amount.clone())
            .set("currency", self.currency.as_str())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A sent or received message (`record_type: "message"`).
pub struct Message {
    pub id: String,
    pub direction: MessageDirection,
    pub message_type: Option<MessageType>,
    pub messaging_profile_id: Option<String>,
    pub from: MessageEndpoint,
    pub to: Vec<MessageRecipient>,
    pub text: Option<String>,
    pub media: Vec<MediaItem>,
    pub parts: Option<i64>,
    pub cost: Option<Cost>,
    pub tags: Vec<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Carrier-level errors, kept as raw JSON.
    pub errors: Vec<serde_json::Value>,
}

static MESSAGE_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("message")
        .field(FieldDescriptor::required("record_type", record_type("message")))
        .field(FieldDescriptor::required("id", FieldKind::string()))
        .field(FieldDescriptor::required(
            "direction",
            FieldKind::Enum(MessageDirection::enum_set()),
        ))
        .field(
            FieldDescriptor::optional("type", FieldKind::Enum(MessageType::enum_set()))
                .named("message_type"),
        )
        .field(FieldDescriptor::optional("messaging_profile_id", FieldKind::string()).nullable())
        .field(FieldDescriptor::required(
            "from",
            FieldKind::Model(MessageEndpoint::schema()),
        ))
        .field(FieldDescriptor::required(
            "to",
            FieldKind::list_of(FieldKind::Model(MessageRecipient::schema())),
        ))
        .field(FieldDescriptor::optional("text", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional(
            "media",
            FieldKind::list_of(FieldKind::Model(MediaItem::schema())),
        ))
        .field(FieldDescriptor::optional("parts", FieldKind::integer()))
        .field(FieldDescriptor::optional("cost", FieldKind::Model(Cost::schema())).nullable())
        .field(FieldDescriptor::optional(
            "tags",
            FieldKind::list_of(FieldKind::string()),
        ))
        .field(FieldDescriptor::optional("received_at", FieldKind::date_time()).nullable())
        .field(FieldDescriptor::optional("sent_at", FieldKind::date_time()).nullable())
        .field(FieldDescriptor::optional("completed_at", FieldKind::date_time()).nullable())
        .field(FieldDescriptor::optional("valid_until", FieldKind::date_time()).nullable())
        .field(FieldDescriptor::optional(
            "errors",
            FieldKind::list_of(FieldKind::json()),
        ))
        .build_table()
});

impl Message {
    /// Delivery state per recipient, in the order the server listed them.
    pub fn statuses(&self) -> impl Iterator<Item = (&str, DeliveryStatus)> + '_ {
        self.to
            .iter()
            .map(|recipient| (recipient.phone_number.as_str(), recipient.status))
    }
}

impl Resource for Message {
    fn schema() -> Arc<Schema> {
        MESSAGE_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        let from = MessageEndpoint::from_model(&model.required::<Model>("from")?)?;
        let cost = model
            .optional::<Model>("cost")?
            .map(|cost| Cost::from_model(&cost))
            .transpose()?;

        Ok(Self {
            id: model.required("id")?,
            direction: model.required_enum("direction")?,
            message_type: model.optional_enum("type")?,
            messaging_profile_id: model.optional("messaging_profile_id")?,
            from,
            to: from_models(model, "to")?,
            text: model.optional("text")?,
            media: from_models(model, "media")?,
            parts: model.optional("parts")?,
            cost,
            tags: model.optional("tags")?.unwrap_or_default(),
            received_at: model.optional("received_at")?,
            sent_at: model.optional("sent_at")?,
            completed_at: model.optional("completed_at")?,
            valid_until: model.optional("valid_until")?,
            errors: model.optional("errors")?.unwrap_or_default(),
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        let cost = self.cost.as_ref().map(Cost::to_model).transpose()?;

        Model::builder(Self::schema())
            .set("record_type", EnumValue::from("message"))
            .set("id", self.id.as_str())
            .set("direction", self.direction.to_field())
            .set_opt("type", self.message_type.map(WireEnum::to_field))
            .set_opt("messaging_profile_id", self.messaging_profile_id.clone())
            .set("from", self.from.to_model()?)
            .set("to", to_models(&self.to)?)
            .set_opt("text", self.text.clone())
            .set("media", to_models(&self.media)?)
            .set_opt("parts", self.parts)
            .set_opt("cost", cost)
            .set("tags", FieldValue::string_list(&self.tags))
            .set_opt("received_at", self.received_at)
            .set_opt("sent_at", self.sent_at)
            .set_opt("completed_at", self.completed_at)
            .set_opt("valid_until", self.valid_until)
            .set(
                "errors",
                FieldValue::List(self.errors.iter().cloned().map(FieldValue::Json).collect()),
            )
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A number owned by the account (`record_type: "phone_number"`).
pub struct PhoneNumberRecord {
    pub id: String,
    pub phone_number: String,
    pub status: PhoneNumberStatus,
    pub phone_number_type: Option<PhoneNumberType>,
    pub tags: Vec<String>,
    pub connection_id: Option<String>,
    pub connection_name: Option<String>,
    pub messaging_profile_id: Option<String>,
    pub billing_group_id: Option<String>,
    pub emergency_enabled: Option<bool>,
    pub call_forwarding_enabled: Option<bool>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

static PHONE_NUMBER_SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Schema::builder("phone_number")
        .field(FieldDescriptor::required("record_type", record_type("phone_number")))
        .field(FieldDescriptor::required("id", FieldKind::string()))
        .field(FieldDescriptor::required("phone_number", FieldKind::string()))
        .field(FieldDescriptor::required(
            "status",
            FieldKind::Enum(PhoneNumberStatus::enum_set()),
        ))
        .field(FieldDescriptor::optional(
            "phone_number_type",
            FieldKind::Enum(PhoneNumberType::enum_set()),
        ))
        .field(FieldDescriptor::optional(
            "tags",
            FieldKind::list_of(FieldKind::string()),
        ))
        .field(FieldDescriptor::optional("connection_id", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("connection_name", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("messaging_profile_id", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("billing_group_id", FieldKind::string()).nullable())
        .field(FieldDescriptor::optional("emergency_enabled", FieldKind::boolean()))
        .field(FieldDescriptor::optional("call_forwarding_enabled", FieldKind::boolean()))
        .field(FieldDescriptor::optional("purchased_at", FieldKind::date_time()).nullable())
        .field(FieldDescriptor::optional("created_at", FieldKind::date_time()))
        .field(FieldDescriptor::optional("updated_at", FieldKind::date_time()))
        .build_table()
});

impl Resource for PhoneNumberRecord {
    fn schema() -> Arc<Schema> {
        PHONE_NUMBER_SCHEMA.clone()
    }

    fn from_model(model: &Model) -> Result<Self, ConversionError> {
        Ok(Self {
            id: model.required("id")?,
            phone_number: model.required("phone_number")?,
            status: model.required_enum("status")?,
            phone_number_type: model.optional_enum("phone_number_type")?,
            tags: model.optional("tags")?.unwrap_or_default(),
            connection_id: model.optional("connection_id")?,
            connection_name: model.optional("connection_name")?,
            messaging_profile_id: model.optional("messaging_profile_id")?,
            billing_group_id: model.optional("billing_group_id")?,
            emergency_enabled: model.optional("emergency_enabled")?,
            call_forwarding_enabled: model.optional("call_forwarding_enabled")?,
            purchased_at: model.optional("purchased_at")?,
            created_at: model.optional("created_at")?,
            updated_at: model.optional("updated_at")?,
        })
    }

    fn to_model(&self) -> Result<Model, ConversionError> {
        Model::builder(Self::schema())
            .set("record_type", EnumValue::from("phone_number"))
            .set("id", self.id.as_str())
            .set("phone_number", self.phone_number.as_str())
            .set("status", self.status.to_field())
            .set_opt(
                "phone_number_type",
                self.phone_number_type.map(WireEnum::to_field),
            )
            .set("tags", FieldValue::string_list(&self.tags))
            .set_opt("connection_id", self.connection_id.clone())
            .set_opt("connection_name", self.connection_name.clone())
            .set_opt("messaging_profile_id", self.messaging_profile_id.clone())
            .set_opt("billing_group_id", self.billing_group_id.clone())
            .set_opt("emergency_enabled", self.emergency_enabled)
            .set_opt("call_forwarding_enabled", self.call_forwarding_enabled)
            .set_opt("purchased_at", self.purchased_at)
            .set_opt("created_at", self.created_at)
            .set_opt("updated_at", self.updated_at)
            .build()
    }
}
