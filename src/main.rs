// src/main.rs
use anyhow::Context;
use log::{LevelFilter, info, warn};

use slab_optimizer::api;
use slab_optimizer::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may set RUST_LOG, so it is read before the logger starts.
    let dotenv_result = dotenvy::dotenv();

    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let packing = app_config.optimizer.packing_config();
    info!(
        "Slab optimizer starting (slab {} x {}, kerf {}, unit factor {})",
        packing.slab_width, packing.slab_height, packing.kerf, packing.unit_factor
    );

    api::start_api_server(app_config.api, app_config.optimizer)
        .await
        .context("slab optimizer service stopped")
}
