use std::sync::Arc;
use backend::{
    config::{Config, StoreConfig},
    cors::Cors,
    routes::{build_rocket, AppState},
    sheets::SheetsStore,
    store::{MemoryStore, RowStore},
};
use shuttle_runtime::CustomError;
use tracing::{info, warn};

async fn connect_store(config: &Config) -> Result<Arc<dyn RowStore>, CustomError> {
    match &config.store {
        StoreConfig::Sheets { spreadsheet_id, account } => {
            let (spreadsheet_id, account) = (spreadsheet_id.clone(), account.clone());
            let store = tokio::task::spawn_blocking(move || SheetsStore::connect(spreadsheet_id, account))
                .await
                .map_err(CustomError::new)?
                .map_err(CustomError::new)?;
            Ok(Arc::new(store))
        }
        StoreConfig::Memory => {
            let members = &config.members;
            let raffle = &config.raffle;
            warn!("Using in-memory row store with empty '{}' and '{}' tables", members.table, raffle.table);
            let store = MemoryStore::new()
                .with_table(&members.table, &[members.nickname_column.as_str(), members.points_column.as_str()])
                .with_table(&raffle.table, &[raffle.name_column.as_str(), raffle.email_column.as_str(), raffle.status_column.as_str()]);
            Ok(Arc::new(store))
        }
    }
}

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting points board server");

    let config = Config::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;
    let store = connect_store(&config).await?;
    info!("📋 Row store ready");

    let app_state = AppState::new(store, &config);
    let rocket = build_rocket(app_state, Cors::new(config.allowed_origin.clone()));

    Ok(rocket.into())
}
