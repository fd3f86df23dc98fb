use axum::{
    Router,
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::handlers;
use crate::state::AppState;

/// Router の構築
///
/// API 以外のパスは静的ドキュメントサイトへフォールバックする
pub fn create_router(state: AppState) -> Router {
    let site = ServeDir::new(&state.config.site_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route(
            "/api/items",
            get(handlers::list_items).post(handlers::create_item),
        )
        .fallback_service(site)
        .layer(cors_layer())
        .with_state(state)
}

/// CORS: 全オリジン・全メソッド・全ヘッダーを許可（デモ用）
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
