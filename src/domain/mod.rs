//! Domain layer: schemas, models, typed resources and validated values (no I/O).

mod conversion;
mod field;
mod model;
mod page;
mod request;
mod response;
mod schema;
mod validation;
mod value;

pub use conversion::{ConversionError, FieldPath};
pub use field::{Decimal, EnumValue, FieldValue};
pub use model::{FromField, Model, ModelBuilder, Resource, WireEnum};
pub use page::{Page, PageRequest, PageTotal};
pub use request::{ListParams, MMS_MAX_MEDIA_URLS, SendMessage, SendOptions};
pub use response::{
    ApiErrorDetail, Cost, DeliveryStatus, MediaItem, Message, MessageDirection, MessageEndpoint,
    MessageRecipient, MessageType, PhoneNumberRecord, PhoneNumberStatus, PhoneNumberType,
};
pub use schema::{
    EnumSet, FieldDescriptor, FieldKind, Presence, PrimitiveType, Schema, SchemaBuilder,
    SchemaError,
};
pub use validation::ValidationError;
pub use value::{ApiKey, MessageId, MessageText, PageNumber, PageSize, PhoneNumber};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_rejects_empty() {
        assert!(matches!(
            ApiKey::new("   "),
            Err(ValidationError::Empty {
                field: ApiKey::FIELD
            })
        ));
    }

    #[test]
    fn message_text_rejects_whitespace_only() {
        assert!(matches!(
            MessageText::new("\n\t "),
            Err(ValidationError::Empty {
                field: MessageText::FIELD
            })
        ));
    }

    #[test]
    fn resource_schemas_expose_wire_keys() {
        let schema = Message::schema();
        assert_eq!(schema.name(), "message");
        let kind = schema.field("type").unwrap();
        assert_eq!(kind.name(), "message_type");
        assert!(!kind.is_required());
        assert!(schema.field("to").unwrap().is_required());
        assert!(schema.field("cost").unwrap().is_nullable());
    }

    #[test]
    fn list_params_default_to_first_page() {
        let params = ListParams::default();
        assert_eq!(params.start, PageNumber::FIRST);
        assert_eq!(params.page_size, None);
        assert!(params.filters().is_empty());
    }

    #[test]
    fn sms_model_uses_e164_numbers() {
        let from = PhoneNumber::parse(Some(phonenumber::country::Id::RU), "79251234567").unwrap();
        let to = PhoneNumber::parse(None, "+74993221627").unwrap();
        let request = SendMessage::sms(
            from,
            to,
            MessageText::new("hi").unwrap(),
            SendOptions::default(),
        );
        let model = request.to_model().unwrap();
        assert_eq!(model.get("from"), Some(&FieldValue::from("+79251234567")));
        assert_eq!(
            model.get("type"),
            Some(&FieldValue::Enum(EnumValue::from("SMS")))
        );
    }
}
