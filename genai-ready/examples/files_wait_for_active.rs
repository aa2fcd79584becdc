use std::time::Duration;

use genai_ready::{CancellationToken, Client, PollConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> genai_ready::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;
    let Ok(path) = std::env::var("GENAI_VIDEO_PATH") else {
        println!("set GENAI_VIDEO_PATH to upload a video and wait for processing.");
        return Ok(());
    };

    let files = client.files();
    let uploaded = files.upload_from_path(&path).await?;
    let name = uploaded.name.unwrap_or_default();
    println!("uploaded: {name}");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let config = PollConfig::default()
        .with_interval(Duration::from_secs(5))
        .with_cancellation(cancel)
        .with_progress(|progress| {
            println!(
                "processing video... (check {}, {:?} elapsed)",
                progress.attempt, progress.elapsed
            );
        });
    let file = files.wait_for_active(&name, config).await?;
    if let Some(data) = file.file_data() {
        println!("ready: {} ({})", data.file_uri, data.mime_type);
    }
    Ok(())
}
