use genai_ready::types::operations::Operation;
use genai_ready::{Client, PollConfig};

#[tokio::main]
async fn main() -> genai_ready::Result<()> {
    let client = Client::from_env()?;
    let Ok(op_name) = std::env::var("GENAI_OPERATION_NAME") else {
        println!("set GENAI_OPERATION_NAME to wait for an operation.");
        return Ok(());
    };
    let op = Operation {
        name: Some(op_name),
        ..Default::default()
    };
    let op = client
        .operations()
        .wait(op, PollConfig::default().with_max_elapsed(None))
        .await?;
    println!("done: {done:?}", done = op.done);
    Ok(())
}
