use crm_core::Config;

// mimalloc as the global allocator; lower fragmentation on musl-based images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, services, routes
    let (_state, router) = crm_api::setup::initialize_app(config.clone()).await?;

    crm_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
