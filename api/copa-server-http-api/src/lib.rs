use std::sync::Arc;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};
use copa_server_app::Application;
use log::info;
use tower_http::cors::{Any, CorsLayer};

pub mod error;
pub mod jwt;

mod admin;
mod json;
mod rounds;
mod standings;
mod teams;

pub use jwt::{AdminAuth, AuthConfig};

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
    pub auth: Arc<AdminAuth>,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let router: Router<AppState> = Router::new().nest(
        "/v1",
        Router::new()
            .route("/admin/login", post(jwt::login))
            .route("/standings", get(standings::get_standings))
            .route("/groups", get(standings::get_groups))
            .route("/mvp", get(standings::get_mvp))
            .route("/mvp/teams", get(standings::get_team_kills))
            .route("/stats", get(standings::get_stats))
            .route("/players/{id}/kills", put(standings::correct_kills))
            .route(
                "/rounds",
                get(rounds::list_rounds).post(rounds::create_round),
            )
            .route("/rounds/latest", get(rounds::latest_round))
            .route("/rounds/{id}/standings", get(rounds::round_standings))
            .route(
                "/rounds/{round_id}/results/{team_id}",
                put(rounds::record_result),
            )
            .route("/teams", get(teams::list_teams).post(teams::register_team))
            .route("/teams/{id}/status", put(teams::set_status))
            .route("/teams/{id}/group", put(teams::set_group))
            .route("/teams/{id}/penalty", put(teams::set_penalty))
            .route("/admin/teams", post(teams::create_team))
            .route("/admin/recompute", post(admin::recompute))
            .route("/admin/dashboard", get(admin::dashboard))
            .route("/admin/confirmations", post(admin::request_confirmation))
            .route(
                "/admin/confirmations/{token}",
                post(admin::confirm_action),
            ),
    );

    router.layer(cors).with_state(state)
}

pub async fn run(
    app: Arc<Application>,
    auth: Arc<AdminAuth>,
    config: HttpConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((config.bind.as_str(), config.port)).await?;

    info!("API server listening on {}:{}", config.bind, config.port);
    axum::serve(listener, router(AppState { app, auth }))
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP API shut down gracefully");
    Ok(())
}
