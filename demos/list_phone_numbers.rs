use futures_util::StreamExt;
use telapi::{ListParams, PageSize, TelApiClientBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = TelApiClientBuilder::from_env()?.build()?;

    let mut params = ListParams::new().page_size(PageSize::new(50)?);
    if let Ok(status) = std::env::var("TELAPI_STATUS_FILTER") {
        params = params.filter("status", status);
    }

    let mut numbers = client.list_phone_numbers(params).await?;
    let mut count = 0_usize;
    while let Some(record) = numbers.next().await {
        let record = record?;
        count += 1;
        println!(
            "{} {:?} tags={:?} connection={:?}",
            record.phone_number, record.status, record.tags, record.connection_name
        );
    }
    println!("{count} numbers");

    Ok(())
}
