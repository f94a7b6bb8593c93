pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;
pub mod search_client;

use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::{
    auth::TokenService,
    booking::{BookingService, PgBookingStore},
};

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub search_client: search_client::SearchClient,
    pub tokens: TokenService,
    pub bookings: BookingService,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        Ok(Self::from_parts(config, db, redis))
    }

    /// Wires services over already connected stores.
    pub fn from_parts(
        config: config::Config,
        db: database::Database,
        redis: redis_client::RedisClient,
    ) -> Arc<Self> {
        let cache = cache::CacheService::new(redis.clone(), db.clone(), config.redis.seat_map_ttl_seconds);
        let search_client = search_client::SearchClient::new(db.pool.clone());
        let tokens = TokenService::new(&config.jwt);
        let bookings = BookingService::new(
            Arc::new(PgBookingStore::new(db.pool.clone())),
            config.features.enforce_seat_bounds,
            config.jwt.secret.clone(),
        );

        Arc::new(Self {
            db,
            redis,
            cache,
            config,
            search_client,
            tokens,
            bookings,
        })
    }
}

/// Full HTTP application: health probes plus the API under `/api`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "CricketTix API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> (StatusCode, &'static str) {
    if let Err(e) = state.db.ping().await {
        tracing::error!("health: database unreachable: {:?}", e);
        return (StatusCode::SERVICE_UNAVAILABLE, "DB DOWN");
    }
    if let Err(e) = state.redis.ping().await {
        tracing::error!("health: redis unreachable: {:?}", e);
        return (StatusCode::SERVICE_UNAVAILABLE, "REDIS DOWN");
    }
    (StatusCode::OK, "OK")
}
