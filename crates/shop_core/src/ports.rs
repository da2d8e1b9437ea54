//! crates/shop_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the storefront.
//! These traits form the boundary of the hexagonal architecture: the web layer
//! only ever talks to them, and the adapters in the `api` service implement them
//! against PostgreSQL, Redis, SMTP and the object store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    BasketAggregate, BasketSelector, BasketSummary, BasketView, Category, CategoryFilter,
    CategoryList, NewPost, NewProduct, NewSession, NewUser, Order, OrderFilter, OrderList,
    OrderPatch, OrderProduct, PictureLink, Post, PostFilter, PostList, PostPatch, Product,
    ProductFilter, ProductList, ProductPatch, Session, User, UserCredentials, UserLookup,
    UserPatch, UserRole,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Repository Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    /// Live (not soft-deleted) user by id or email.
    async fn get_user(&self, lookup: UserLookup) -> PortResult<User>;

    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials>;

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User>;

    /// Soft-deletes the user and deactivates their sessions.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create_session(&self, session: NewSession) -> PortResult<Session>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    async fn deactivate_session(&self, session_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create_category(&self, name: &str) -> PortResult<Category>;

    async fn get_category(&self, category_id: Uuid) -> PortResult<Category>;

    async fn list_categories(&self, filter: CategoryFilter) -> PortResult<CategoryList>;

    async fn update_category(&self, category_id: Uuid, name: &str) -> PortResult<Category>;

    async fn delete_category(&self, category_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: NewProduct) -> PortResult<Product>;

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product>;

    async fn list_products(&self, filter: ProductFilter) -> PortResult<ProductList>;

    /// A price or discount change re-prices every open basket line of the product.
    async fn update_product(&self, product_id: Uuid, patch: ProductPatch) -> PortResult<Product>;

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()>;

    async fn add_picture(&self, picture: PictureLink) -> PortResult<()>;

    async fn delete_picture(&self, picture: PictureLink) -> PortResult<()>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> PortResult<Post>;

    async fn get_post(&self, post_id: Uuid) -> PortResult<Post>;

    async fn list_posts(&self, filter: PostFilter) -> PortResult<PostList>;

    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> PortResult<Post>;

    async fn delete_post(&self, post_id: Uuid) -> PortResult<()>;

    async fn add_post_picture(&self, picture: PictureLink) -> PortResult<()>;

    async fn delete_post_picture(&self, picture: PictureLink) -> PortResult<()>;
}

#[async_trait]
pub trait BasketRepository: Send + Sync {
    /// Prices the line from the product's current price and returns the new summary.
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> PortResult<BasketSummary>;

    /// Soft-deletes pending rows. Returns how many rows were stamped.
    async fn delete_basket(&self, selector: BasketSelector) -> PortResult<u64>;

    /// Pending lines of the user. An empty basket is an empty view, not an error.
    async fn get_basket(&self, user_id: Uuid) -> PortResult<BasketView>;

    async fn aggregate_for_user(&self, user_id: Uuid) -> PortResult<BasketAggregate>;

    /// Re-applies the pricing rule to pending lines of a product.
    async fn recompute_prices(&self, product_id: Uuid) -> PortResult<u64>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Converts the user's pending basket into an order in one transaction.
    async fn create_order(&self, user_id: Uuid) -> PortResult<Order>;

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order>;

    async fn update_order(&self, order_id: Uuid, patch: OrderPatch) -> PortResult<Order>;

    /// Soft-deletes the order together with its sold basket rows.
    async fn delete_order(&self, order_id: Uuid) -> PortResult<()>;

    async fn list_orders(&self, filter: OrderFilter) -> PortResult<OrderList>;

    async fn order_products(&self, order_id: Uuid) -> PortResult<Vec<OrderProduct>>;
}

//=========================================================================================
// Infrastructure Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CacheService: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> PortResult<()>;

    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn delete(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Sends the one-time verification code to a pending user.
    async fn send_otp(&self, to: &str, otp: &str) -> PortResult<()>;
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores an object and returns its public URL.
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PortResult<String>;
}

pub trait PolicyEnforcer: Send + Sync {
    /// Decides whether `role` may call `method` on the route template `path`.
    fn enforce(&self, role: UserRole, path: &str, method: &str) -> bool;
}
