use std::io;

use telapi::{MessageId, TelApiClientBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let id = std::env::var("TELAPI_MESSAGE_ID").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "TELAPI_MESSAGE_ID environment variable is required",
        )
    })?;

    let client = TelApiClientBuilder::from_env()?.build()?;
    let message = client.retrieve_message(&MessageId::new(id)?).await?;

    println!(
        "id: {}, from: {}, sent_at: {:?}, completed_at: {:?}",
        message.id, message.from.phone_number, message.sent_at, message.completed_at
    );
    for (number, status) in message.statuses() {
        let state = if status.is_final() { "final" } else { "pending" };
        println!("  {number}: {status:?} ({state})");
    }

    Ok(())
}
