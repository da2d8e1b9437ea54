//! crates/shop_core/src/usecase.rs
//!
//! The use-case facade handed to HTTP handlers. It only aggregates the
//! repository ports; every call is a straight delegation.

use std::sync::Arc;

use crate::ports::{
    BasketRepository, CategoryRepository, OrderRepository, PostRepository, ProductRepository,
    SessionRepository, UserRepository,
};

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub basket: Arc<dyn BasketRepository>,
    pub orders: Arc<dyn OrderRepository>,
}
