use std::io;

use telapi::{MessageText, PhoneNumber, SendMessage, SendOptions, TelApiClientBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let from = std::env::var("TELAPI_FROM").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "TELAPI_FROM environment variable is required",
        )
    })?;
    let to = std::env::var("TELAPI_TO").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "TELAPI_TO environment variable is required",
        )
    })?;
    let text = std::env::var("TELAPI_MESSAGE")
        .unwrap_or_else(|_| "Hello from the telapi send_message demo.".to_owned());

    let client = TelApiClientBuilder::from_env()?.build()?;
    let request = SendMessage::sms(
        PhoneNumber::parse(None, from)?,
        PhoneNumber::parse(None, to)?,
        MessageText::new(text)?,
        SendOptions {
            messaging_profile_id: std::env::var("TELAPI_MESSAGING_PROFILE_ID").ok(),
            ..SendOptions::default()
        },
    );

    let message = client.send_message(request).await?;
    println!(
        "id: {}, direction: {:?}, parts: {:?}, cost: {:?}",
        message.id, message.direction, message.parts, message.cost
    );
    for (number, status) in message.statuses() {
        println!("  {number}: {status:?}");
    }

    Ok(())
}
