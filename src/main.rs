mod config;
mod error;
mod hub;
mod proto;
mod registry;
mod routes;
mod state;

use axum::{Extension, Router};
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::hub::{Hub, HubOptions};
use error::AppErr;

#[tokio::main]
async fn main() -> Result<(), AppErr> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().init();

    let config = Config::from_env()?;
    let (hub_tx, hub_rx) = mpsc::unbounded_channel();
    let hub = Hub::new(HubOptions {
        host_secret: config.host_secret.clone(),
        chat_capacity: config.chat_capacity,
    });
    tokio::spawn(hub.run(hub_rx));    // single owner of all room state

    let app = Router::new()
        .merge(routes::router())
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(Extension(hub_tx))
        .layer(Extension(config.clone()));

    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("listening on http://{}", config.listen_addr());
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
