use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;

use cardroom::config::AppConfig;
use cardroom::registry::TableRegistry;
use cardroom::state::app_state::AppState;
use cardroom::{routes, telemetry};

fn build_cors(config: &AppConfig) -> Cors {
    if config.allowed_origins.is_empty() {
        return Cors::permissive();
    }
    let mut cors = Cors::default().allow_any_method().allow_any_header();
    for origin in &config.allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();
    telemetry::init_tracing(config.prod);

    let registry = TableRegistry::new();
    registry.start_sweeper();

    let app_state = AppState::new(registry, config.clone());
    let port = config.port;
    info!(port, prod = config.prod, "starting cardroom");

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&config))
            .app_data(web::Data::new(app_state.clone()))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
