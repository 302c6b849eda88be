use vellum_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, object storage, services, routes)
    let (_state, router) = vellum_api::setup::initialize_app(config.clone()).await?;

    vellum_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
