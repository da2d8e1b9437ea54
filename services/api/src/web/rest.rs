//! services/api/src/web/rest.rs
//!
//! Shared REST payloads and the master definition for the OpenAPI
//! specification.

use serde::{Deserialize, Serialize};
use shop_core::domain::{
    BasketLine, BasketProduct, BasketSummary, BasketView, Category, CategoryList, NewProduct,
    Order, OrderList, OrderPatch, OrderProduct, OrderStatus, Pagination, Post, PostList,
    PostPatch, Product, ProductList, ProductPatch, User, UserRole,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::error::ErrorEnvelope;
use crate::web::{auth, basket, category, media, order, post, product, user};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::health_handler,
        auth::register_handler,
        auth::verify_email_handler,
        auth::login_handler,
        auth::logout_handler,
        user::get_user_handler,
        user::update_user_handler,
        user::delete_user_handler,
        product::create_product_handler,
        product::get_product_handler,
        product::list_products_handler,
        product::update_product_handler,
        product::delete_product_handler,
        product::add_product_picture_handler,
        product::delete_product_picture_handler,
        category::create_category_handler,
        category::get_category_handler,
        category::list_categories_handler,
        category::update_category_handler,
        category::delete_category_handler,
        post::create_post_handler,
        post::get_post_handler,
        post::list_posts_handler,
        post::update_post_handler,
        post::delete_post_handler,
        post::add_post_picture_handler,
        post::delete_post_picture_handler,
        basket::add_item_handler,
        basket::delete_item_handler,
        basket::clear_basket_handler,
        basket::get_basket_handler,
        order::create_order_handler,
        order::update_order_handler,
        order::get_order_handler,
        order::delete_order_handler,
        order::list_orders_handler,
        order::order_products_handler,
        media::upload_media_handler,
    ),
    components(
        schemas(
            ErrorEnvelope, MessageResponse, Pagination, UserRole, User,
            auth::RegisterRequest, auth::VerifyEmailRequest, auth::LoginRequest, auth::AuthResponse,
            user::UpdateUserRequest,
            Product, NewProduct, ProductPatch, ProductList, product::ProductPictureRequest,
            Category, CategoryList, category::CategoryRequest,
            Post, PostList, PostPatch, post::CreatePostRequest, post::UpdatePostRequest,
            post::PostPictureRequest,
            BasketSummary, BasketView, BasketLine, BasketProduct, basket::AddItemRequest,
            basket::DeletedResponse,
            Order, OrderList, OrderPatch, OrderStatus, OrderProduct, order::UpdateOrderRequest,
            media::UploadResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "storefront", description = "Catalog, basket and order endpoints of the shop backend.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Shared Payloads
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/healthz",
            "/v1/auth/register",
            "/v1/basket/item",
            "/v1/order/list",
            "/v1/product/{id}",
            "/v1/minio/media",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
