//! Calls against a real API account.
//!
//! Each test builds a [`LiveConfig`] from the environment and returns early
//! when it is absent, so `cargo test` stays offline by default. Set
//! `TELAPI_LIVE_API_KEY` (and optionally `TELAPI_LIVE_BASE_URL`) to run them.

use futures_util::StreamExt;
use telapi::{Auth, ListParams, PageSize, TelApiClient, TelApiError};

struct LiveConfig {
    api_key: String,
    base_url: Option<String>,
}

impl LiveConfig {
    fn from_env() -> Option<Self> {
        let api_key = std::env::var("TELAPI_LIVE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())?;
        let base_url = std::env::var("TELAPI_LIVE_BASE_URL").ok();
        Some(Self { api_key, base_url })
    }

    fn client(&self) -> TelApiClient {
        let mut builder = TelApiClient::builder(Auth::api_key(&self.api_key).unwrap());
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url);
        }
        builder.build().unwrap()
    }
}

#[tokio::test]
async fn lists_phone_numbers_across_pages() {
    let Some(config) = LiveConfig::from_env() else {
        return;
    };
    let client = config.client();

    let params = ListParams::new().page_size(PageSize::new(2).unwrap());
    let mut numbers = client.list_phone_numbers(params).await.unwrap();
    let mut seen = 0_usize;
    while let Some(record) = numbers.next().await {
        let record = record.unwrap();
        assert!(!record.id.is_empty());
        assert!(record.phone_number.starts_with('+'));
        seen += 1;
        if seen >= 6 {
            break;
        }
    }
}

#[tokio::test]
async fn unknown_message_id_is_an_api_error() {
    let Some(config) = LiveConfig::from_env() else {
        return;
    };
    let client = config.client();

    let id = telapi::MessageId::new("00000000-0000-0000-0000-000000000000").unwrap();
    let err = client.retrieve_message(&id).await.unwrap_err();
    assert!(
        matches!(
            err,
            TelApiError::Api { status: 404, .. } | TelApiError::HttpStatus { status: 404, .. }
        ),
        "unexpected error: {err:?}"
    );
}
