//! services/api/src/web/mod.rs
//!
//! HTTP layer: handlers grouped per resource, the auth/policy middleware and
//! the router that stitches them together.

pub mod auth;
pub mod basket;
pub mod category;
pub mod extract;
pub mod media;
pub mod middleware;
pub mod order;
pub mod post;
pub mod product;
pub mod rest;
pub mod state;
pub mod user;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::rest::{ApiDoc, MessageResponse};
use crate::web::state::AppState;

pub use middleware::{authorize, AuthContext};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, body = MessageResponse))
)]
pub async fn health_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::SESSION_HEADER),
        ])
}

/// Builds the complete application: `/v1` API behind the policy middleware,
/// the health probe and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // --- auth & user ---
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/verify-email", post(auth::verify_email_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/user", put(user::update_user_handler))
        .route(
            "/user/{id}",
            get(user::get_user_handler).delete(user::delete_user_handler),
        )
        // --- catalog ---
        .route("/product", post(product::create_product_handler))
        .route("/product/list", get(product::list_products_handler))
        .route(
            "/product/picture",
            post(product::add_product_picture_handler).delete(product::delete_product_picture_handler),
        )
        .route(
            "/product/{id}",
            get(product::get_product_handler)
                .put(product::update_product_handler)
                .delete(product::delete_product_handler),
        )
        .route("/category", post(category::create_category_handler))
        .route("/category/list", get(category::list_categories_handler))
        .route(
            "/category/{id}",
            get(category::get_category_handler)
                .put(category::update_category_handler)
                .delete(category::delete_category_handler),
        )
        // --- content ---
        .route(
            "/post",
            post(post::create_post_handler).put(post::update_post_handler),
        )
        .route("/post/list", get(post::list_posts_handler))
        .route(
            "/post/picture",
            post(post::add_post_picture_handler).delete(post::delete_post_picture_handler),
        )
        .route(
            "/post/{id}",
            get(post::get_post_handler).delete(post::delete_post_handler),
        )
        // --- basket & orders ---
        .route("/basket", delete(basket::clear_basket_handler))
        .route(
            "/basket/item",
            post(basket::add_item_handler).delete(basket::delete_item_handler),
        )
        .route("/basket/get", get(basket::get_basket_handler))
        .route(
            "/order",
            post(order::create_order_handler).put(order::update_order_handler),
        )
        .route("/order/list", get(order::list_orders_handler))
        .route("/order/products", get(order::order_products_handler))
        .route(
            "/order/{id}",
            get(order::get_order_handler).delete(order::delete_order_handler),
        )
        // --- media ---
        .route("/minio/media", post(media::upload_media_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), authorize));

    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/healthz", get(health_handler))
        .nest("/v1", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
