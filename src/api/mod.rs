use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::generator::AnswerGenerator;
use crate::retriever::ContextRetriever;

pub mod error;
pub mod handlers;
pub mod models;

/// Components shared by every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<dyn ContextRetriever>,
    pub generator: Arc<dyn AnswerGenerator>,
}

impl AppState {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> AppState {
        AppState {
            retriever,
            generator,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // The documentation site calls the endpoint from the browser.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/perguntar", post(handlers::ask_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(error::panic_response))
                .layer(cors),
        )
}
