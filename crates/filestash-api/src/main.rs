use filestash_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (metadata store, blob store, routes)
    let (_state, router) = filestash_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    filestash_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
