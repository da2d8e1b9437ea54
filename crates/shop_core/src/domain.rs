//! crates/shop_core/src/domain.rs
//!
//! Defines the core data structures for the storefront.
//! These structs know nothing about SQL rows or HTTP extractors; adapters
//! translate their own records into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Users & Sessions
//=========================================================================================

/// The role carried in access tokens and evaluated by the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Unauthorized,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "unauthorized" => Ok(UserRole::Unauthorized),
            other => Err(PortError::BadRequest(format!("unknown role '{}'", other))),
        }
    }
}

/// A registered customer or administrator, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub user_role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A user waiting for email verification. Serialized into the cache between
/// registration and OTP confirmation, so the hash is already computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: String,
    pub user_role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(Uuid),
    Email(String),
}

/// Sparse self-update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.password_hash.is_none()
    }
}

/// A login session referenced by the `session_id` claim of an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// An active, unexpired session may authorize requests.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Pagination
//=========================================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One-based page window shared by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    /// Builds a window from raw query values. Pages below 1 become 1 and the
    /// limit is clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let limit = limit
            .unwrap_or(i64::from(DEFAULT_PAGE_LIMIT))
            .clamp(1, i64::from(MAX_PAGE_LIMIT)) as u32;
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

//=========================================================================================
// Categories
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub name: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<Category>,
    pub total_count: i64,
    pub pagination: Pagination,
}

//=========================================================================================
// Products & Pictures
//=========================================================================================

/// A catalog entry. `sale_price` is a discount percentage, see [`crate::pricing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub product_type: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub picture_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct NewProduct {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub product_type: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub picture_url: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), PortError> {
        if self.title.trim().is_empty() {
            return Err(PortError::BadRequest("title is required".to_string()));
        }
        if self.product_type.trim().is_empty() {
            return Err(PortError::BadRequest("type is required".to_string()));
        }
        crate::pricing::validate_price(self.price)?;
        crate::pricing::validate_discount(self.sale_price)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub product_type: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.sale_price.is_none()
            && self.product_type.is_none()
            && self.color.is_none()
            && self.size.is_none()
    }

    /// True when open baskets holding the product must be re-priced.
    pub fn changes_price(&self) -> bool {
        self.price.is_some() || self.sale_price.is_some()
    }

    pub fn validate(&self) -> Result<(), PortError> {
        if let Some(price) = self.price {
            crate::pricing::validate_price(price)?;
        }
        crate::pricing::validate_discount(self.sale_price)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub title: Option<String>,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    pub category_id: Option<Uuid>,
    pub product_type: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub total_count: i64,
    pub pagination: Pagination,
}

/// Links a picture URL to its owning product or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PictureLink {
    pub owner_id: Uuid,
    pub picture_url: String,
}

//=========================================================================================
// Basket
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BasketStatus {
    NotSold,
    Sold,
}

impl BasketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketStatus::NotSold => "not_sold",
            BasketStatus::Sold => "sold",
        }
    }
}

/// Selects which basket rows a delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasketSelector {
    Item(Uuid),
    User(Uuid),
}

impl BasketSelector {
    /// Exactly one of the two ids must be supplied.
    pub fn from_parts(item_id: Option<Uuid>, user_id: Option<Uuid>) -> Result<Self, PortError> {
        match (item_id, user_id) {
            (Some(item), None) => Ok(BasketSelector::Item(item)),
            (None, Some(user)) => Ok(BasketSelector::User(user)),
            (None, None) => Err(PortError::BadRequest(
                "basket_id or user_id must be provided".to_string(),
            )),
            (Some(_), Some(_)) => Err(PortError::BadRequest(
                "basket_id and user_id are mutually exclusive".to_string(),
            )),
        }
    }
}

/// Returned after adding an item: the user's pending basket in summary form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BasketSummary {
    pub item_ids: Vec<Uuid>,
    pub total_price: f64,
    pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BasketProduct {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BasketLine {
    pub id: Uuid,
    pub price: f64,
    pub count: i32,
    pub product: BasketProduct,
    pub pictures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BasketView {
    pub items: Vec<BasketLine>,
    pub total_price: f64,
    pub total_count: i64,
}

impl BasketView {
    /// Line prices are already multiplied by count, so totals are plain sums.
    pub fn from_lines(items: Vec<BasketLine>) -> Self {
        let total_price = items.iter().map(|line| line.price).sum();
        let total_count = items.iter().map(|line| i64::from(line.count)).sum();
        Self {
            items,
            total_price,
            total_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub const MIXED_ORDER_TYPE: &str = "mixed";

/// One pending basket row as seen by the order conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLine {
    pub id: Uuid,
    pub price: f64,
    pub count: i32,
    pub product_type: String,
}

/// The input to order creation: everything still `not_sold` for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasketAggregate {
    pub item_ids: Vec<Uuid>,
    pub total_price: f64,
    pub total_count: i64,
    pub order_type: Option<String>,
}

impl BasketAggregate {
    pub fn from_lines(lines: &[PendingLine]) -> Self {
        let mut aggregate = BasketAggregate::default();
        for line in lines {
            aggregate.item_ids.push(line.id);
            aggregate.total_price += line.price;
            aggregate.total_count += i64::from(line.count);
            aggregate.order_type = match aggregate.order_type.take() {
                None => Some(line.product_type.clone()),
                Some(existing) if existing == line.product_type => Some(existing),
                Some(_) => Some(MIXED_ORDER_TYPE.to_string()),
            };
        }
        aggregate
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    pub fn summary(&self) -> BasketSummary {
        BasketSummary {
            item_ids: self.item_ids.clone(),
            total_price: self.total_price,
            total_count: self.total_count,
        }
    }
}

//=========================================================================================
// Orders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    InProgress,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(OrderStatus::InProgress),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(PortError::Unexpected(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub order_type: String,
    pub quantity: i32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse order update; an empty patch only bumps `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct OrderPatch {
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub quantity: Option<i32>,
    pub total_price: Option<f64>,
    pub status: Option<OrderStatus>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.order_type.is_none()
            && self.quantity.is_none()
            && self.total_price.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct OrderFilter {
    pub user_id: Uuid,
    pub order_type: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub total_count: i64,
    pub pagination: Pagination,
}

/// One receipt line of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderProduct {
    pub product_id: Uuid,
    pub title: String,
    pub description: String,
    pub unit_price: f64,
    pub count: i32,
    pub line_price: f64,
    pub picture_urls: Vec<String>,
}

//=========================================================================================
// Posts
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub picture_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub title: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostList {
    pub posts: Vec<Post>,
    pub total_count: i64,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_type: &str, price: f64, count: i32) -> PendingLine {
        PendingLine {
            id: Uuid::new_v4(),
            price,
            count,
            product_type: product_type.to_string(),
        }
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, limit: 1 });
        assert_eq!(Pagination::new(Some(-3), Some(5000)).limit, MAX_PAGE_LIMIT);
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(Pagination::new(Some(1), Some(10)).offset(), 0);
    }

    #[test]
    fn basket_selector_requires_exactly_one_id() {
        let id = Uuid::new_v4();
        assert_eq!(
            BasketSelector::from_parts(Some(id), None).unwrap(),
            BasketSelector::Item(id)
        );
        assert_eq!(
            BasketSelector::from_parts(None, Some(id)).unwrap(),
            BasketSelector::User(id)
        );
        assert!(matches!(
            BasketSelector::from_parts(None, None),
            Err(PortError::BadRequest(_))
        ));
        assert!(matches!(
            BasketSelector::from_parts(Some(id), Some(id)),
            Err(PortError::BadRequest(_))
        ));
    }

    #[test]
    fn aggregate_sums_lines_and_keeps_shared_type() {
        let lines = vec![line("shoes", 30.0, 1), line("shoes", 45.5, 2)];
        let aggregate = BasketAggregate::from_lines(&lines);

        assert_eq!(aggregate.item_ids, vec![lines[0].id, lines[1].id]);
        assert_eq!(aggregate.total_price, 75.5);
        assert_eq!(aggregate.total_count, 3);
        assert_eq!(aggregate.order_type.as_deref(), Some("shoes"));
    }

    #[test]
    fn aggregate_of_mixed_types_is_tagged_mixed() {
        let lines = vec![line("shoes", 1.0, 1), line("hats", 1.0, 1), line("shoes", 1.0, 1)];
        let aggregate = BasketAggregate::from_lines(&lines);
        assert_eq!(aggregate.order_type.as_deref(), Some(MIXED_ORDER_TYPE));
    }

    #[test]
    fn empty_aggregate_has_no_type() {
        let aggregate = BasketAggregate::from_lines(&[]);
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.order_type, None);
        assert_eq!(aggregate.summary(), BasketSummary::default());
    }

    #[test]
    fn basket_view_totals_are_line_sums() {
        let product = BasketProduct {
            id: Uuid::new_v4(),
            title: "Scarf".to_string(),
            description: String::new(),
        };
        let view = BasketView::from_lines(vec![
            BasketLine {
                id: Uuid::new_v4(),
                price: 20.0,
                count: 2,
                product: product.clone(),
                pictures: vec![],
            },
            BasketLine {
                id: Uuid::new_v4(),
                price: 5.0,
                count: 1,
                product,
                pictures: vec![],
            },
        ]);
        assert_eq!(view.total_price, 25.0);
        assert_eq!(view.total_count, 3);
    }

    #[test]
    fn statuses_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(serde_json::to_string(&BasketStatus::NotSold).unwrap(), "\"not_sold\"");
        assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn session_usability_requires_active_and_unexpired() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            is_active: true,
            expires_at: now + chrono::Duration::hours(1),
            last_active_at: now,
            created_at: now,
        };
        assert!(session.is_usable_at(now));
        session.is_active = false;
        assert!(!session.is_usable_at(now));
        session.is_active = true;
        session.expires_at = now - chrono::Duration::seconds(1);
        assert!(!session.is_usable_at(now));
    }

    #[test]
    fn patches_report_emptiness() {
        assert!(UserPatch::default().is_empty());
        assert!(OrderPatch::default().is_empty());
        let patch = ProductPatch {
            sale_price: Some(10.0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert!(patch.changes_price());
        assert!(!ProductPatch {
            title: Some("x".to_string()),
            ..Default::default()
        }
        .changes_price());
    }
}
