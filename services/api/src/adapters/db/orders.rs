//! Orders. `create_order` is the basket-to-order transition: the pending lines
//! are read under a row lock, the order is inserted and the lines are stamped
//! `sold` with its id, all inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{
    BasketAggregate, BasketStatus, Order, OrderFilter, OrderList, OrderPatch, OrderProduct,
    OrderStatus,
};
use shop_core::ports::{OrderRepository, PortError, PortResult};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::basket::pending_lines;
use super::{pictures_for, port_error, DbAdapter, PictureTable};

const ORDER_COLUMNS: &str =
    "id, user_id, order_type, quantity, total_price, status, created_at, updated_at";

#[derive(FromRow)]
struct OrderRecord {
    id: Uuid,
    user_id: Uuid,
    order_type: String,
    quantity: i32,
    total_price: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRecord {
    fn to_domain(self) -> PortResult<Order> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            order_type: self.order_type,
            quantity: self.quantity,
            total_price: self.total_price,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderLineRecord {
    product_id: Uuid,
    title: String,
    description: String,
    price: f64,
    count: i32,
}

/// Renders the sparse `UPDATE orders` statement. An empty patch still touches
/// `updated_at`.
pub(crate) fn order_update_query(order_id: Uuid, patch: OrderPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET updated_at = now()");
    if let Some(order_type) = patch.order_type {
        qb.push(", order_type = ").push_bind(order_type);
    }
    if let Some(quantity) = patch.quantity {
        qb.push(", quantity = ").push_bind(quantity);
    }
    if let Some(total_price) = patch.total_price {
        qb.push(", total_price = ").push_bind(total_price);
    }
    if let Some(status) = patch.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    qb.push(" WHERE id = ")
        .push_bind(order_id)
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(ORDER_COLUMNS);
    qb
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE deleted_at IS NULL AND user_id = ")
        .push_bind(filter.user_id);
    if let Some(order_type) = &filter.order_type {
        qb.push(" AND order_type = ").push_bind(order_type.clone());
    }
}

fn order_quantity(aggregate: &BasketAggregate) -> PortResult<i32> {
    i32::try_from(aggregate.total_count)
        .map_err(|_| PortError::BadRequest("basket quantity is too large".to_string()))
}

#[async_trait]
impl OrderRepository for DbAdapter {
    #[tracing::instrument(skip(self))]
    async fn create_order(&self, user_id: Uuid) -> PortResult<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "order"))?;

        let lines = pending_lines(&mut *tx, user_id, true).await?;
        let aggregate = BasketAggregate::from_lines(&lines);
        let Some(order_type) = aggregate.order_type.clone() else {
            return Err(PortError::BadRequest("basket is empty".to_string()));
        };
        let quantity = order_quantity(&aggregate)?;

        let sql = format!(
            "INSERT INTO orders (id, user_id, order_type, quantity, total_price, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ORDER_COLUMNS
        );
        let record = sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&order_type)
            .bind(quantity)
            .bind(aggregate.total_price)
            .bind(OrderStatus::InProgress.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| port_error(e, "order"))?;

        let stamped = sqlx::query(
            "UPDATE basket_items SET order_id = $1, status = $2 \
             WHERE id = ANY($3) AND status = 'not_sold' AND deleted_at IS NULL",
        )
        .bind(record.id)
        .bind(BasketStatus::Sold.as_str())
        .bind(&aggregate.item_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| port_error(e, "basket"))?
        .rows_affected();

        if stamped != aggregate.item_ids.len() as u64 {
            return Err(PortError::Unexpected(format!(
                "stamped {} of {} basket items",
                stamped,
                aggregate.item_ids.len()
            )));
        }

        tx.commit().await.map_err(|e| port_error(e, "order"))?;
        tracing::info!(order_id = %record.id, items = stamped, "Order created from basket");
        record.to_domain()
    }

    #[tracing::instrument(skip(self))]
    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = $1 AND deleted_at IS NULL",
            ORDER_COLUMNS
        );
        sqlx::query_as::<_, OrderRecord>(&sql)
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "order"))?
            .to_domain()
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_order(&self, order_id: Uuid, patch: OrderPatch) -> PortResult<Order> {
        if matches!(patch.quantity, Some(q) if q < 0) {
            return Err(PortError::BadRequest("quantity must not be negative".to_string()));
        }
        let mut qb = order_update_query(order_id, patch);
        qb.build_query_as::<OrderRecord>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "order"))?
            .to_domain()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, order_id: Uuid) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "order"))?;

        let deleted = sqlx::query(
            "UPDATE orders SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| port_error(e, "order"))?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound("order not found".to_string()));
        }

        sqlx::query(
            "UPDATE basket_items SET deleted_at = now() WHERE order_id = $1 AND deleted_at IS NULL",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| port_error(e, "basket"))?;

        tx.commit().await.map_err(|e| port_error(e, "order"))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_orders(&self, filter: OrderFilter) -> PortResult<OrderList> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(ORDER_COLUMNS).push(" FROM orders");
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());
        let records = qb
            .build_query_as::<OrderRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| port_error(e, "order"))?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filter(&mut count, &filter);
        let total_count: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "order"))?;

        let orders = records
            .into_iter()
            .map(OrderRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok(OrderList {
            orders,
            total_count,
            pagination: filter.pagination,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn order_products(&self, order_id: Uuid) -> PortResult<Vec<OrderProduct>> {
        let records = sqlx::query_as::<_, OrderLineRecord>(
            "SELECT p.id AS product_id, p.title, p.description, b.price, b.count \
             FROM basket_items b JOIN products p ON p.id = b.product_id \
             WHERE b.order_id = $1 AND b.status = 'sold' \
             AND b.deleted_at IS NULL \
             ORDER BY b.created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| port_error(e, "order"))?;

        let mut product_ids: Vec<Uuid> = records.iter().map(|r| r.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let pictures = pictures_for(&self.pool, PictureTable::Product, &product_ids).await?;

        Ok(records
            .into_iter()
            .map(|r| OrderProduct {
                product_id: r.product_id,
                unit_price: r.price / f64::from(r.count.max(1)),
                picture_urls: pictures.get(&r.product_id).cloned().unwrap_or_default(),
                title: r.title,
                description: r.description,
                count: r.count,
                line_price: r.price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::domain::Pagination;

    #[test]
    fn empty_patch_only_touches_updated_at() {
        let qb = order_update_query(Uuid::nil(), OrderPatch::default());
        assert_eq!(
            qb.sql(),
            format!(
                "UPDATE orders SET updated_at = now() WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
                ORDER_COLUMNS
            )
        );
    }

    #[test]
    fn status_patch_binds_wire_value() {
        let patch = OrderPatch {
            status: Some(OrderStatus::Shipped),
            ..Default::default()
        };
        let qb = order_update_query(Uuid::nil(), patch);
        assert!(qb
            .sql()
            .starts_with("UPDATE orders SET updated_at = now(), status = $1 WHERE id = $2"));
    }

    #[test]
    fn type_filter_is_appended_to_both_queries() {
        let filter = OrderFilter {
            user_id: Uuid::nil(),
            order_type: Some("shoes".to_string()),
            pagination: Pagination::default(),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
        push_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM orders WHERE deleted_at IS NULL AND user_id = $1 AND order_type = $2"
        );
    }

    #[test]
    fn oversized_quantity_is_rejected() {
        let aggregate = BasketAggregate {
            total_count: i64::from(i32::MAX) + 1,
            ..Default::default()
        };
        assert!(matches!(order_quantity(&aggregate), Err(PortError::BadRequest(_))));
    }
}
