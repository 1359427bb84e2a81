use std::sync::Arc;

use copa_persistence_sea_orm::{
    PlayerRepositoryImpl, RoundRepositoryImpl, TeamRepositoryImpl, create_db_pool, ensure_schema,
};
use copa_server_app::build_application;
use copa_server_http_api::AdminAuth;
use log::{error, info};

use crate::config::ServerConfig;

mod config;
mod logs;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logs::init_logger(config.log_file.clone()) {
        eprintln!("Failed to initialize logger: {}", e);
        std::process::exit(1);
    }

    let db = match create_db_pool(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = ensure_schema(&db).await {
        error!("Failed to prepare database schema: {}", e);
        std::process::exit(1);
    }

    let team_repo = Arc::new(TeamRepositoryImpl::new(db.clone()));
    let player_repo = Arc::new(PlayerRepositoryImpl::new(db.clone()));
    let round_repo = Arc::new(RoundRepositoryImpl::new(db));

    let app = Arc::new(build_application(
        team_repo,
        player_repo,
        round_repo,
        config.app,
    ));
    let auth = Arc::new(AdminAuth::new(config.auth));

    info!("Starting application");

    if let Err(e) = app.recompute_standings_workflow.recompute_all().await {
        error!("Startup audit failed: {}", e);
    }

    if let Err(e) = copa_server_http_api::run(app, auth, config.http, shutdown_signal()).await {
        error!("HTTP API failed: {}", e);
        std::process::exit(1);
    }
}
