//! In-memory port fakes and a harness that drives the real router with them.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use shop_core::domain::*;
use shop_core::ports::*;
use shop_core::pricing;
use shop_core::usecase::Repositories;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::adapters::PolicyTable;
use api_lib::config::Config;
use api_lib::token::JwtCodec;
use api_lib::web::{router, state::AppState};

pub const TEST_POLICY: &str = include_str!("../../config/policy.csv");

//=========================================================================================
// Repository Fake
//=========================================================================================

struct Row<T> {
    value: T,
    deleted: bool,
}

impl<T> Row<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            deleted: false,
        }
    }
}

struct UserRow {
    user: User,
    password_hash: String,
    deleted: bool,
}

#[derive(Clone)]
struct BasketRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    price: f64,
    count: i32,
    sold: bool,
    order_id: Option<Uuid>,
    deleted: bool,
}

#[derive(Default)]
struct Inner {
    users: Vec<UserRow>,
    sessions: Vec<Session>,
    categories: Vec<Row<Category>>,
    products: Vec<Row<Product>>,
    posts: Vec<Row<Post>>,
    basket: Vec<BasketRow>,
    orders: Vec<Row<Order>>,
}

impl Inner {
    fn live_product(&self, id: Uuid) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| !p.deleted && p.value.id == id)
            .map(|p| &p.value)
    }

    fn pending(&self, user_id: Uuid) -> Vec<(BasketRow, Product)> {
        self.basket
            .iter()
            .filter(|b| b.user_id == user_id && !b.sold && !b.deleted)
            .filter_map(|b| self.live_product(b.product_id).map(|p| (b.clone(), p.clone())))
            .collect()
    }

    fn pending_lines(&self, user_id: Uuid) -> Vec<PendingLine> {
        self.pending(user_id)
            .into_iter()
            .map(|(b, p)| PendingLine {
                id: b.id,
                price: b.price,
                count: b.count,
                product_type: p.product_type,
            })
            .collect()
    }

    fn reprice(&mut self, product_id: Uuid, unit_price: f64) -> u64 {
        let mut touched = 0;
        for row in self
            .basket
            .iter_mut()
            .filter(|b| b.product_id == product_id && !b.sold && !b.deleted)
        {
            row.price = unit_price * f64::from(row.count);
            touched += 1;
        }
        touched
    }
}

fn page<T>(items: Vec<T>, pagination: Pagination) -> Vec<T> {
    items
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit() as usize)
        .collect()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn basket_rows_of(&self, user_id: Uuid) -> Vec<(Uuid, bool, Option<Uuid>, bool)> {
        self.inner
            .lock()
            .unwrap()
            .basket
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| (b.id, b.sold, b.order_id, b.deleted))
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .users
            .iter()
            .any(|u| !u.deleted && u.user.email == user.email)
        {
            return Err(PortError::Conflict("user already exists".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            user_role: user.user_role,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(UserRow {
            user: created.clone(),
            password_hash: user.password_hash,
            deleted: false,
        });
        Ok(created)
    }

    async fn get_user(&self, lookup: UserLookup) -> PortResult<User> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .filter(|u| !u.deleted)
            .find(|u| match &lookup {
                UserLookup::Id(id) => u.user.id == *id,
                UserLookup::Email(email) => &u.user.email == email,
            })
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound("user not found".to_string()))
    }

    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| !u.deleted && u.user.email == email)
            .map(|u| UserCredentials {
                user: u.user.clone(),
                password_hash: u.password_hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound("user not found".to_string()))
    }

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User> {
        if patch.is_empty() {
            return Err(PortError::BadRequest("no fields to update".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .users
            .iter_mut()
            .find(|u| !u.deleted && u.user.id == user_id)
            .ok_or_else(|| PortError::NotFound("user not found".to_string()))?;
        if let Some(v) = patch.first_name {
            row.user.first_name = v;
        }
        if let Some(v) = patch.last_name {
            row.user.last_name = v;
        }
        if let Some(v) = patch.email {
            row.user.email = v;
        }
        if let Some(v) = patch.phone_number {
            row.user.phone_number = v;
        }
        if let Some(v) = patch.password_hash {
            row.password_hash = v;
        }
        row.user.updated_at = Utc::now();
        Ok(row.user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .users
            .iter_mut()
            .find(|u| !u.deleted && u.user.id == user_id)
            .ok_or_else(|| PortError::NotFound("user not found".to_string()))?;
        row.deleted = true;
        for session in inner.sessions.iter_mut().filter(|s| s.user_id == user_id) {
            session.is_active = false;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        let now = Utc::now();
        let created = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_active: true,
            expires_at: session.expires_at,
            last_active_at: now,
            created_at: now,
        };
        self.inner.lock().unwrap().sessions.push(created.clone());
        Ok(created)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("session not found".to_string()))
    }

    async fn deactivate_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound("session not found".to_string()))?;
        session.is_active = false;
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create_category(&self, name: &str) -> PortResult<Category> {
        if name.trim().is_empty() {
            return Err(PortError::BadRequest("name is required".to_string()));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .unwrap()
            .categories
            .push(Row::live(category.clone()));
        Ok(category)
    }

    async fn get_category(&self, category_id: Uuid) -> PortResult<Category> {
        self.inner
            .lock()
            .unwrap()
            .categories
            .iter()
            .find(|c| !c.deleted && c.value.id == category_id)
            .map(|c| c.value.clone())
            .ok_or_else(|| PortError::NotFound("category not found".to_string()))
    }

    async fn list_categories(&self, filter: CategoryFilter) -> PortResult<CategoryList> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<Category> = inner
            .categories
            .iter()
            .rev()
            .filter(|c| !c.deleted)
            .filter(|c| filter.name.as_deref().map_or(true, |n| contains_ci(&c.value.name, n)))
            .map(|c| c.value.clone())
            .collect();
        Ok(CategoryList {
            total_count: matching.len() as i64,
            categories: page(matching, filter.pagination),
            pagination: filter.pagination,
        })
    }

    async fn update_category(&self, category_id: Uuid, name: &str) -> PortResult<Category> {
        if name.trim().is_empty() {
            return Err(PortError::BadRequest("name is required".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .categories
            .iter_mut()
            .find(|c| !c.deleted && c.value.id == category_id)
            .ok_or_else(|| PortError::NotFound("category not found".to_string()))?;
        row.value.name = name.trim().to_string();
        row.value.updated_at = Utc::now();
        Ok(row.value.clone())
    }

    async fn delete_category(&self, category_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .categories
            .iter_mut()
            .find(|c| !c.deleted && c.value.id == category_id)
            .ok_or_else(|| PortError::NotFound("category not found".to_string()))?;
        row.deleted = true;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        product.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner
            .categories
            .iter()
            .any(|c| !c.deleted && c.value.id == product.category_id)
        {
            return Err(PortError::NotFound("category not found".to_string()));
        }
        let now = Utc::now();
        let created = Product {
            id: Uuid::new_v4(),
            category_id: product.category_id,
            title: product.title,
            description: product.description,
            price: product.price,
            sale_price: product.sale_price,
            product_type: product.product_type,
            color: product.color,
            size: product.size,
            picture_urls: product.picture_url.into_iter().collect(),
            created_at: now,
            updated_at: now,
        };
        inner.products.push(Row::live(created.clone()));
        Ok(created)
    }

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        self.inner
            .lock()
            .unwrap()
            .live_product(product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))
    }

    async fn list_products(&self, filter: ProductFilter) -> PortResult<ProductList> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<Product> = inner
            .products
            .iter()
            .rev()
            .filter(|p| !p.deleted)
            .map(|p| &p.value)
            .filter(|p| filter.title.as_deref().map_or(true, |t| contains_ci(&p.title, t)))
            .filter(|p| filter.price_from.map_or(true, |v| p.price >= v))
            .filter(|p| filter.price_to.map_or(true, |v| p.price <= v))
            .filter(|p| filter.category_id.map_or(true, |v| p.category_id == v))
            .filter(|p| {
                filter
                    .product_type
                    .as_deref()
                    .map_or(true, |v| p.product_type == v)
            })
            .cloned()
            .collect();
        Ok(ProductList {
            total_count: matching.len() as i64,
            products: page(matching, filter.pagination),
            pagination: filter.pagination,
        })
    }

    async fn update_product(&self, product_id: Uuid, patch: ProductPatch) -> PortResult<Product> {
        if patch.is_empty() {
            return Err(PortError::BadRequest("no fields to update".to_string()));
        }
        patch.validate()?;
        let reprice = patch.changes_price();
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .products
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == product_id)
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))?;
        let p = &mut row.value;
        if let Some(v) = patch.title {
            p.title = v;
        }
        if let Some(v) = patch.description {
            p.description = v;
        }
        if let Some(v) = patch.price {
            p.price = v;
        }
        if let Some(v) = patch.sale_price {
            p.sale_price = Some(v);
        }
        if let Some(v) = patch.product_type {
            p.product_type = v;
        }
        if let Some(v) = patch.color {
            p.color = Some(v);
        }
        if let Some(v) = patch.size {
            p.size = Some(v);
        }
        p.updated_at = Utc::now();
        let updated = p.clone();
        if reprice {
            let unit = pricing::final_unit_price(updated.price, updated.sale_price);
            inner.reprice(product_id, unit);
        }
        Ok(updated)
    }

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .products
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == product_id)
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))?;
        row.deleted = true;
        Ok(())
    }

    async fn add_picture(&self, picture: PictureLink) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .products
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == picture.owner_id)
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))?;
        row.value.picture_urls.push(picture.picture_url);
        Ok(())
    }

    async fn delete_picture(&self, picture: PictureLink) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .products
            .iter_mut()
            .find(|p| p.value.id == picture.owner_id)
            .ok_or_else(|| PortError::NotFound("picture not found".to_string()))?;
        let before = row.value.picture_urls.len();
        row.value.picture_urls.retain(|u| u != &picture.picture_url);
        if before == row.value.picture_urls.len() {
            return Err(PortError::NotFound("picture not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: NewPost) -> PortResult<Post> {
        if post.title.trim().is_empty() {
            return Err(PortError::BadRequest("title is required".to_string()));
        }
        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            picture_urls: post.picture_url.into_iter().collect(),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .unwrap()
            .posts
            .push(Row::live(created.clone()));
        Ok(created)
    }

    async fn get_post(&self, post_id: Uuid) -> PortResult<Post> {
        self.inner
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| !p.deleted && p.value.id == post_id)
            .map(|p| p.value.clone())
            .ok_or_else(|| PortError::NotFound("post not found".to_string()))
    }

    async fn list_posts(&self, filter: PostFilter) -> PortResult<PostList> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<Post> = inner
            .posts
            .iter()
            .rev()
            .filter(|p| !p.deleted)
            .map(|p| &p.value)
            .filter(|p| filter.title.as_deref().map_or(true, |t| contains_ci(&p.title, t)))
            .filter(|p| filter.created_from.map_or(true, |v| p.created_at >= v))
            .filter(|p| filter.created_to.map_or(true, |v| p.created_at <= v))
            .cloned()
            .collect();
        Ok(PostList {
            total_count: matching.len() as i64,
            posts: page(matching, filter.pagination),
            pagination: filter.pagination,
        })
    }

    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> PortResult<Post> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .posts
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == post_id)
            .ok_or_else(|| PortError::NotFound("post not found".to_string()))?;
        if let Some(v) = patch.title {
            row.value.title = v;
        }
        if let Some(v) = patch.content {
            row.value.content = v;
        }
        row.value.updated_at = Utc::now();
        Ok(row.value.clone())
    }

    async fn delete_post(&self, post_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .posts
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == post_id)
            .ok_or_else(|| PortError::NotFound("post not found".to_string()))?;
        row.deleted = true;
        Ok(())
    }

    async fn add_post_picture(&self, picture: PictureLink) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .posts
            .iter_mut()
            .find(|p| !p.deleted && p.value.id == picture.owner_id)
            .ok_or_else(|| PortError::NotFound("post not found".to_string()))?;
        row.value.picture_urls.push(picture.picture_url);
        Ok(())
    }

    async fn delete_post_picture(&self, picture: PictureLink) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .posts
            .iter_mut()
            .find(|p| p.value.id == picture.owner_id)
            .ok_or_else(|| PortError::NotFound("picture not found".to_string()))?;
        let before = row.value.picture_urls.len();
        row.value.picture_urls.retain(|u| u != &picture.picture_url);
        if before == row.value.picture_urls.len() {
            return Err(PortError::NotFound("picture not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BasketRepository for MemoryStore {
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> PortResult<BasketSummary> {
        pricing::validate_count(count)?;
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .live_product(product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))?;
        inner.basket.push(BasketRow {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            price: pricing::line_price(product.price, product.sale_price, count),
            count,
            sold: false,
            order_id: None,
            deleted: false,
        });
        Ok(BasketAggregate::from_lines(&inner.pending_lines(user_id)).summary())
    }

    async fn delete_basket(&self, selector: BasketSelector) -> PortResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut affected = 0;
        for row in inner.basket.iter_mut().filter(|b| !b.sold && !b.deleted) {
            let hit = match selector {
                BasketSelector::Item(id) => row.id == id,
                BasketSelector::User(user) => row.user_id == user,
            };
            if hit {
                row.deleted = true;
                affected += 1;
            }
        }
        if affected == 0 && matches!(selector, BasketSelector::Item(_)) {
            return Err(PortError::NotFound("basket item not found".to_string()));
        }
        Ok(affected)
    }

    async fn get_basket(&self, user_id: Uuid) -> PortResult<BasketView> {
        let inner = self.inner.lock().unwrap();
        let lines = inner
            .pending(user_id)
            .into_iter()
            .map(|(b, p)| BasketLine {
                id: b.id,
                price: b.price,
                count: b.count,
                pictures: p.picture_urls.clone(),
                product: BasketProduct {
                    id: p.id,
                    title: p.title,
                    description: p.description,
                },
            })
            .collect();
        Ok(BasketView::from_lines(lines))
    }

    async fn aggregate_for_user(&self, user_id: Uuid) -> PortResult<BasketAggregate> {
        let inner = self.inner.lock().unwrap();
        Ok(BasketAggregate::from_lines(&inner.pending_lines(user_id)))
    }

    async fn recompute_prices(&self, product_id: Uuid) -> PortResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .live_product(product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("product not found".to_string()))?;
        let unit = pricing::final_unit_price(product.price, product.sale_price);
        Ok(inner.reprice(product_id, unit))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, user_id: Uuid) -> PortResult<Order> {
        let mut inner = self.inner.lock().unwrap();
        let aggregate = BasketAggregate::from_lines(&inner.pending_lines(user_id));
        let Some(order_type) = aggregate.order_type.clone() else {
            return Err(PortError::BadRequest("basket is empty".to_string()));
        };
        // Distinct, strictly increasing timestamps keep "newest first" deterministic.
        let now = Utc::now() + Duration::milliseconds(inner.orders.len() as i64);
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            order_type,
            quantity: aggregate.total_count as i32,
            total_price: aggregate.total_price,
            status: OrderStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        for row in inner
            .basket
            .iter_mut()
            .filter(|b| aggregate.item_ids.contains(&b.id))
        {
            row.sold = true;
            row.order_id = Some(order.id);
        }
        inner.orders.push(Row::live(order.clone()));
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        self.inner
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| !o.deleted && o.value.id == order_id)
            .map(|o| o.value.clone())
            .ok_or_else(|| PortError::NotFound("order not found".to_string()))
    }

    async fn update_order(&self, order_id: Uuid, patch: OrderPatch) -> PortResult<Order> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .orders
            .iter_mut()
            .find(|o| !o.deleted && o.value.id == order_id)
            .ok_or_else(|| PortError::NotFound("order not found".to_string()))?;
        if let Some(v) = patch.order_type {
            row.value.order_type = v;
        }
        if let Some(v) = patch.quantity {
            row.value.quantity = v;
        }
        if let Some(v) = patch.total_price {
            row.value.total_price = v;
        }
        if let Some(v) = patch.status {
            row.value.status = v;
        }
        row.value.updated_at = Utc::now();
        Ok(row.value.clone())
    }

    async fn delete_order(&self, order_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .orders
            .iter_mut()
            .find(|o| !o.deleted && o.value.id == order_id)
            .ok_or_else(|| PortError::NotFound("order not found".to_string()))?;
        row.deleted = true;
        for item in inner
            .basket
            .iter_mut()
            .filter(|b| b.order_id == Some(order_id))
        {
            item.deleted = true;
        }
        Ok(())
    }

    async fn list_orders(&self, filter: OrderFilter) -> PortResult<OrderList> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| !o.deleted && o.value.user_id == filter.user_id)
            .filter(|o| {
                filter
                    .order_type
                    .as_deref()
                    .map_or(true, |t| o.value.order_type == t)
            })
            .map(|o| o.value.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(OrderList {
            total_count: matching.len() as i64,
            orders: page(matching, filter.pagination),
            pagination: filter.pagination,
        })
    }

    async fn order_products(&self, order_id: Uuid) -> PortResult<Vec<OrderProduct>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .basket
            .iter()
            .filter(|b| b.order_id == Some(order_id) && b.sold && !b.deleted)
            .filter_map(|b| {
                let p = &inner.products.iter().find(|p| p.value.id == b.product_id)?.value;
                Some(OrderProduct {
                    product_id: p.id,
                    title: p.title.clone(),
                    description: p.description.clone(),
                    unit_price: b.price / f64::from(b.count),
                    count: b.count,
                    line_price: b.price,
                    picture_urls: p.picture_urls.clone(),
                })
            })
            .collect())
    }
}

//=========================================================================================
// Infrastructure Fakes
//=========================================================================================

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, u64)>>,
}

impl MemoryCache {
    pub fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> PortResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl_seconds));
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entry(key).map(|(value, _)| value))
    }

    async fn delete(&self, key: &str) -> PortResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailService for RecordingMailer {
    async fn send_otp(&self, to: &str, otp: &str) -> PortResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), otp.to_string()));
        Ok(())
    }
}

pub struct MemoryMedia;

#[async_trait]
impl MediaStorage for MemoryMedia {
    async fn put_object(&self, key: &str, _bytes: Vec<u8>, _content_type: &str) -> PortResult<String> {
        Ok(format!("http://media.test/photos/{}", key))
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub fn test_config() -> Config {
    let env: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("JWT_SECRET", "test-secret"),
        ("SMTP_USERNAME", "robot@shop.test"),
        ("SMTP_PASSWORD", "pw"),
        ("MEDIA_ACCESS_KEY", "minio"),
        ("MEDIA_SECRET_KEY", "minio123"),
    ]);
    Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).expect("test config")
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: JwtCodec,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Arc::new(test_config());
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(MemoryCache::default());
        let mailer = Arc::new(RecordingMailer::default());
        let tokens = JwtCodec::new(&config.jwt);

        let repos = Repositories {
            users: store.clone(),
            sessions: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            posts: store.clone(),
            basket: store.clone(),
            orders: store.clone(),
        };
        let state = Arc::new(AppState {
            repos,
            cache: cache.clone(),
            mailer: mailer.clone(),
            media: Arc::new(MemoryMedia),
            policy: Arc::new(PolicyTable::from_csv(TEST_POLICY).expect("policy parses")),
            tokens: tokens.clone(),
            config,
        });

        Self {
            router: router(state),
            store,
            cache,
            mailer,
            tokens,
        }
    }

    /// Sends a JSON request and returns the status with the parsed body.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Creates a user with a live session and returns it with a bearer token.
    pub async fn sign_in(&self, role: UserRole) -> (User, String) {
        let email = format!("{}@shop.test", Uuid::new_v4());
        let user = self
            .store
            .create_user(NewUser {
                first_name: "Test".to_string(),
                last_name: role.to_string(),
                email,
                password_hash: "unused".to_string(),
                phone_number: String::new(),
                user_role: role,
            })
            .await
            .unwrap();
        let token = self.open_session(&user).await;
        (user, token)
    }

    pub async fn open_session(&self, user: &User) -> String {
        let now = Utc::now();
        let session = self
            .store
            .create_session(NewSession {
                user_id: user.id,
                ip_address: "127.0.0.1".to_string(),
                user_agent: "tests".to_string(),
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();
        self.tokens
            .issue(user.id, user.user_role, session.id, now)
            .unwrap()
    }

    pub async fn seed_product(&self, product_type: &str, price: f64, sale_price: Option<f64>) -> Product {
        let category = self.store.create_category("Seeded").await.unwrap();
        self.store
            .create_product(NewProduct {
                category_id: category.id,
                title: format!("{} item", product_type),
                description: "seeded".to_string(),
                price,
                sale_price,
                product_type: product_type.to_string(),
                color: None,
                size: None,
                picture_url: Some("http://media.test/photos/p.png".to_string()),
            })
            .await
            .unwrap()
    }
}
