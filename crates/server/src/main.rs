use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    leadgate_server::run().await
}
