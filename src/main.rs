use log::{error, info};
use seat_inventory::config::Config;
use seat_inventory::persistence::json_file::{load_store, snapshot, write_catalog};
use seat_inventory::persistence::memory::InMemoryStore;
use seat_inventory::services::ExpirySweeper;
use seat_inventory::web::app::{init_app_state, run_app};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,actix_web=info")).init();

    let config = Config::from_env().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let store = match &config.catalog_path {
        Some(path) => {
            let store = load_store(path).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            info!("Loaded catalog from {}", path.display());
            store
        }
        None => InMemoryStore::new(),
    };

    let app_state = init_app_state(store.clone(), &config);
    ExpirySweeper::new(app_state.holds.clone(), app_state.events.clone(), config.sweep_interval).spawn();
    info!(
        "Holds last {}s, swept every {}s",
        config.hold_duration.as_secs(),
        config.sweep_interval.as_secs()
    );

    run_app(config.clone(), app_state).await?;

    if let Some(path) = &config.catalog_path {
        match snapshot(&store).map_err(|e| e.to_string()).and_then(|catalog| write_catalog(path, &catalog)) {
            Ok(()) => info!("Saved catalog to {}", path.display()),
            Err(err) => error!("Could not save catalog to {}: {}", path.display(), err),
        }
    }
    Ok(())
}
