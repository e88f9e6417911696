#![allow(clippy::missing_errors_doc)]

use color_eyre::eyre::{Result, eyre};
use language_model::{ChatClient, Message};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run() -> Result<()> {
    let endpoint = std::env::var("LLM_ENDPOINT").unwrap_or_else(|_| "http://localhost:8080".into());
    let api_key = std::env::var("AZURE_API_KEY").ok();
    let api_version = std::env::var("LLM_API_VERSION").ok();
    let client = ChatClient::with_base_url(&endpoint)
        .model("gpt-5-mini")
        .maybe_api_key(api_key)
        .maybe_api_version(api_version)
        .build()?;

    let now = Instant::now();
    info!(
        "Single prompt: {}",
        client
            .chat("Write one short instruction asking to segment the left ventricle.")
            .call()
            .await?
    );

    let messages = [
        Message::system(
            "You are a medical AI specialist. Generate SHORT instructions for anatomical segmentation tasks.",
        ),
        Message::user("Target Structure: liver\nImaging Context: CT of the abdomen"),
    ];
    let caption = client.call(&messages).await?;
    if caption.trim().is_empty() {
        return Err(eyre!("model returned an empty caption"));
    }
    info!("With system prompt: {caption}");
    info!("Total time for [API]: {:?}", now.elapsed());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    run().await?;

    Ok(())
}
