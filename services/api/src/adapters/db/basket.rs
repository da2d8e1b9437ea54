//! Basket rows. Only live `not_sold` rows whose product is still live make up
//! a user's basket; `sold` rows belong to an order and keep their frozen price.

use async_trait::async_trait;
use shop_core::domain::{
    BasketAggregate, BasketLine, BasketProduct, BasketSelector, BasketStatus, BasketSummary,
    BasketView, PendingLine,
};
use shop_core::ports::{BasketRepository, PortError, PortResult};
use shop_core::pricing;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use super::{pictures_for, port_error, DbAdapter, PictureTable};

const PENDING_LINES_SQL: &str = "SELECT b.id, b.price, b.count, p.product_type \
     FROM basket_items b JOIN products p ON p.id = b.product_id \
     WHERE b.user_id = $1 AND b.status = 'not_sold' \
     AND b.deleted_at IS NULL AND p.deleted_at IS NULL \
     ORDER BY b.created_at";

#[derive(FromRow)]
struct PendingLineRecord {
    id: Uuid,
    price: f64,
    count: i32,
    product_type: String,
}

#[derive(FromRow)]
struct BasketLineRecord {
    id: Uuid,
    price: f64,
    count: i32,
    product_id: Uuid,
    title: String,
    description: String,
}

#[derive(FromRow)]
struct ProductPriceRecord {
    price: f64,
    sale_price: Option<f64>,
}

/// Reads the pending lines of a user. With `lock`, the basket rows stay locked
/// until the surrounding transaction ends.
pub(super) async fn pending_lines<'e, E>(
    executor: E,
    user_id: Uuid,
    lock: bool,
) -> PortResult<Vec<PendingLine>>
where
    E: PgExecutor<'e>,
{
    let sql = if lock {
        format!("{} FOR UPDATE OF b", PENDING_LINES_SQL)
    } else {
        PENDING_LINES_SQL.to_string()
    };
    let records = sqlx::query_as::<_, PendingLineRecord>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(|e| port_error(e, "basket"))?;
    Ok(records
        .into_iter()
        .map(|r| PendingLine {
            id: r.id,
            price: r.price,
            count: r.count,
            product_type: r.product_type,
        })
        .collect())
}

/// Sets `price = unit_price * count` on every pending line of the product.
pub(super) async fn reprice_pending_lines<'e, E>(
    executor: E,
    product_id: Uuid,
    unit_price: f64,
) -> PortResult<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE basket_items SET price = $2 * count \
         WHERE product_id = $1 AND status = 'not_sold' AND deleted_at IS NULL",
    )
    .bind(product_id)
    .bind(unit_price)
    .execute(executor)
    .await
    .map_err(|e| port_error(e, "basket"))?;
    Ok(result.rows_affected())
}

async fn product_price<'e, E>(executor: E, product_id: Uuid) -> PortResult<ProductPriceRecord>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ProductPriceRecord>(
        "SELECT price, sale_price FROM products WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await
    .map_err(|e| port_error(e, "product"))
}

#[async_trait]
impl BasketRepository for DbAdapter {
    #[tracing::instrument(skip(self))]
    async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        count: i32,
    ) -> PortResult<BasketSummary> {
        pricing::validate_count(count)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "basket"))?;

        let product = product_price(&mut *tx, product_id).await?;
        let price = pricing::line_price(product.price, product.sale_price, count);

        sqlx::query(
            "INSERT INTO basket_items (id, product_id, user_id, price, count, status) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(user_id)
        .bind(price)
        .bind(count)
        .bind(BasketStatus::NotSold.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| port_error(e, "basket item"))?;

        let lines = pending_lines(&mut *tx, user_id, false).await?;
        tx.commit().await.map_err(|e| port_error(e, "basket"))?;

        Ok(BasketAggregate::from_lines(&lines).summary())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_basket(&self, selector: BasketSelector) -> PortResult<u64> {
        let query = match selector {
            BasketSelector::Item(item_id) => sqlx::query(
                "UPDATE basket_items SET deleted_at = now() \
                 WHERE id = $1 AND status = 'not_sold' AND deleted_at IS NULL",
            )
            .bind(item_id),
            BasketSelector::User(user_id) => sqlx::query(
                "UPDATE basket_items SET deleted_at = now() \
                 WHERE user_id = $1 AND status = 'not_sold' AND deleted_at IS NULL",
            )
            .bind(user_id),
        };
        let affected = query
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "basket"))?
            .rows_affected();

        if affected == 0 && matches!(selector, BasketSelector::Item(_)) {
            return Err(PortError::NotFound("basket item not found".to_string()));
        }
        Ok(affected)
    }

    #[tracing::instrument(skip(self))]
    async fn get_basket(&self, user_id: Uuid) -> PortResult<BasketView> {
        let records = sqlx::query_as::<_, BasketLineRecord>(
            "SELECT b.id, b.price, b.count, p.id AS product_id, p.title, p.description \
             FROM basket_items b JOIN products p ON p.id = b.product_id \
             WHERE b.user_id = $1 AND b.status = 'not_sold' \
             AND b.deleted_at IS NULL AND p.deleted_at IS NULL \
             ORDER BY b.created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| port_error(e, "basket"))?;

        let mut product_ids: Vec<Uuid> = records.iter().map(|r| r.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let pictures = pictures_for(&self.pool, PictureTable::Product, &product_ids).await?;

        let lines = records
            .into_iter()
            .map(|r| BasketLine {
                id: r.id,
                price: r.price,
                count: r.count,
                pictures: pictures.get(&r.product_id).cloned().unwrap_or_default(),
                product: BasketProduct {
                    id: r.product_id,
                    title: r.title,
                    description: r.description,
                },
            })
            .collect();
        Ok(BasketView::from_lines(lines))
    }

    #[tracing::instrument(skip(self))]
    async fn aggregate_for_user(&self, user_id: Uuid) -> PortResult<BasketAggregate> {
        let lines = pending_lines(&self.pool, user_id, false).await?;
        Ok(BasketAggregate::from_lines(&lines))
    }

    #[tracing::instrument(skip(self))]
    async fn recompute_prices(&self, product_id: Uuid) -> PortResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "basket"))?;
        let product = product_price(&mut *tx, product_id).await?;
        let unit_price = pricing::final_unit_price(product.price, product.sale_price);
        let repriced = reprice_pending_lines(&mut *tx, product_id, unit_price).await?;
        tx.commit().await.map_err(|e| port_error(e, "basket"))?;
        Ok(repriced)
    }
}
