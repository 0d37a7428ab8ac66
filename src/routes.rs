//! HTTP surface: the websocket upgrade and a deployment health probe.

use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::ws::session;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(session::upgrade))
        .route("/health", web::get().to(health));
}

async fn health(state: web::Data<crate::state::app_state::AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "tables": state.registry().len(),
    }))
}
