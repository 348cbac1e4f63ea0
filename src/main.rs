use log::{error, info};
use std::fmt::Display;
use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;

use gstate::{AppConfig, AppState, PinController, SqliteStore, StateStore, recovery};

#[cfg(feature = "hardware-gpio")]
use gstate::LibgpiodBackend;
#[cfg(not(feature = "hardware-gpio"))]
use gstate::MockGpioBackend;

fn fatal<T, E: Display>(context: &str) -> impl FnOnce(E) -> T + '_ {
    move |e| {
        error!("{context}: {e}");
        std::process::exit(1)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let store = Arc::new(
        SqliteStore::open(&config.dbfile).unwrap_or_else(fatal("Failed to open state store")),
    );
    store
        .ensure_schema()
        .unwrap_or_else(fatal("Failed to initialize state store"));

    let backend = {
        #[cfg(feature = "hardware-gpio")]
        {
            Arc::new(
                LibgpiodBackend::new(&config.chip)
                    .unwrap_or_else(fatal("Failed to init libgpiod backend")),
            )
        }
        #[cfg(not(feature = "hardware-gpio"))]
        {
            Arc::new(MockGpioBackend::default())
        }
    };
    let controller = Arc::new(PinController::new(backend));

    if config.recovery {
        match recovery::run(controller.as_ref(), store.as_ref()) {
            Ok(n) => info!("gpio state recovered ({n} pins)"),
            Err(e) => error!("gpio state recovery failed: {e}"),
        }
    }

    let app_state = AppState::new(controller, store, config.storage_errors);

    let scope_path = config.path.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(app_state.clone()))
            .service(app_state.api_scope(&scope_path))
    })
    .bind(config.bind_addr())
    .unwrap_or_else(fatal("Failed to bind listener"));

    info!("Starting HTTP server on port: {}", config.listen_port);

    server.run().await
}
