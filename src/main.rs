#[tokio::main]
async fn main() -> anyhow::Result<()> {
    busbeacon_lib::run().await
}
