use filevault_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (telemetry, database, storage, routes)
    let (state, app) = filevault_api::setup::initialize_app(config).await?;

    // Start the server
    filevault_api::setup::server::start_server(state, app).await?;

    Ok(())
}
