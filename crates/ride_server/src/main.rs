use ride_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    ride_server::start_server(config).await?;
    Ok(())
}
