mod utils;

use std::{env, error::Error, sync::Arc};

use basalt::{
    config::{ConfigLoadError, ServerConfig},
    registry::Registry,
    server::Server,
    telemetry::init_meter,
};
use tokio::sync::broadcast;

use crate::utils::leak;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    #[cfg(debug_assertions)]
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    #[cfg(not(debug_assertions))]
    env_logger::init();

    let provider = init_meter();

    let config_file = env::current_dir()?.join("settings.toml");
    let config = match ServerConfig::load(&config_file) {
        Ok(config) => {
            // Save config to fill missing fields
            let _ = config.save(&config_file);
            config
        }
        Err(ConfigLoadError::Io(_)) => {
            let config = ServerConfig::default();
            let _ = config.save(&config_file);
            config
        }
        Err(ConfigLoadError::Parse(error)) => return Err(error.into()),
    };

    let registry = Registry::bundled()?;
    let server = Arc::new(Server::new(config, registry));
    let listener = server.bind().await?;

    let stop = leak(broadcast::channel(1).0);
    let serving = tokio::spawn(server.serve(listener, stop.subscribe()));
    {
        use futures::future::{select_all, FutureExt};
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let sigint_fut = sigint.recv().boxed();
        let sigterm_fut = sigterm.recv().boxed();

        let _ = select_all([sigint_fut, sigterm_fut]).await;
        log::info!("Received signal, stopping...");
        stop.send(())?;
    }

    match serving.await {
        Ok(Err(e)) => log::error!("{e}"),
        Err(e) => log::error!("{e}"),
        Ok(Ok(())) => {}
    }
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            log::warn!("Failed to flush metrics: {e}");
        }
    }
    Ok(())
}
