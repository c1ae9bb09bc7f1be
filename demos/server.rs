//! Demo server: loads the schema (and optional seed) named by the environment into a
//! memory store, binds the sample methods, and serves `/entities/...`.
//!
//! Run: `SEED_PATH=demos/sample/seed.json cargo run --example server`

use axum::Router;
use entity_rest::{
    common_routes, entity_routes, load_schema, resolve, ApiError, AppState, EntityStore, FnMethod, Include,
    IncludeEntry, MemoryStore, MethodTable, ServerConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("entity_rest=info")),
        )
        .init();

    let schema = load_schema(&config.schema_path).await?;
    let store = Arc::new(MemoryStore::new(&schema));
    if let Some(seed) = &config.seed_path {
        let n = store.seed_from_path(seed).await?;
        tracing::info!(documents = n, path = %seed.display(), "seeded");
    }

    let methods = MethodTable::new()
        .bind(
            "User",
            "greet",
            FnMethod(|id: String, body: Value| async move {
                let from = body.get("from").and_then(Value::as_str).unwrap_or("someone");
                Ok::<_, ApiError>(json!(format!("{} says hello to user {}", from, id)))
            }),
        )
        .bind("Pet", "feed", {
            let store = store.clone();
            FnMethod(move |id: String, body: Value| {
                let store = store.clone();
                async move {
                    let portions = match body.get("portions") {
                        None => 1,
                        Some(v) => v.as_i64().ok_or(ApiError::InvalidMethodArguments)?,
                    };
                    let current = store
                        .fetch("Pet", &id, &Include::single("meals", IncludeEntry::All))
                        .await?;
                    let meals = current["meals"].as_i64().unwrap_or(0) + portions;
                    store.mutate("Pet", &id, json!({ "meals": meals })).await
                }
            })
        });

    let registry = resolve(&schema, store, methods)?;
    let state = AppState::new(registry);

    let app = Router::new()
        .merge(common_routes())
        .merge(entity_routes(state, config.max_body_bytes));

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
