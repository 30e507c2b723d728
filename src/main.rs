// src/main.rs
use parcel_packer::api::{self, ApiState};
use parcel_packer::catalog::{BoxCatalog, load_catalog_file};
use parcel_packer::config::AppConfig;
use parcel_packer::model::BoxType;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let catalog = initial_catalog(&app_config);
    tracing::info!(
        "🚀 Parcel packer starting with {} box types...",
        catalog.len().await
    );

    let state = ApiState::new(app_config.optimizer.clone(), catalog);
    api::start_api_server(app_config.api.clone(), state).await
}

fn initial_catalog(app_config: &AppConfig) -> BoxCatalog {
    let Some(path) = app_config.catalog.path() else {
        return BoxCatalog::seeded(BoxType::default_catalog());
    };
    match load_catalog_file(path) {
        Ok(catalog) => {
            tracing::info!("🗃️ Box catalog loaded from {}", path.display());
            catalog
        }
        Err(err) => {
            tracing::warn!("⚠️ {}. Using the default box catalog.", err);
            BoxCatalog::seeded(BoxType::default_catalog())
        }
    }
}
