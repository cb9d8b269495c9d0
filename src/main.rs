// src/main.rs
mod api;
mod auth;
mod db;
mod error;
mod models;
mod portfolio;

use crate::auth::JwtVerifier;
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::env;
use std::sync::Arc;
use warp::Filter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let secret = match env::var("JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            error!("JWT_SECRET must be set");
            return;
        }
    };
    let node = env::var("SCYLLA_NODE").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
    let origin = env::var("CLIENT_ORIGIN")
        .unwrap_or_else(|_| "https://cryptotrack-ultimez.vercel.app".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3030);

    let session = match db::init(&node).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    info!("Connected to database...");

    let verifier = Arc::new(JwtVerifier::new(secret));

    let cors = warp::cors()
        .allow_origin(origin.as_str())
        .allow_credentials(true)
        .allow_headers(vec!["authorization", "content-type"])
        .allow_methods(vec!["GET", "POST", "PUT"]);

    let api = api::routes(session, verifier)
        .recover(error::handle_rejection)
        .with(cors);

    info!("Server running on http://127.0.0.1:{}", port);
    warp::serve(api).run(([127, 0, 0, 1], port)).await;
}
