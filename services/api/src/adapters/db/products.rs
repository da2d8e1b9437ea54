//! Catalog products and their pictures. Price-affecting updates re-price open
//! basket lines inside the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{NewProduct, PictureLink, Product, ProductFilter, ProductList, ProductPatch};
use shop_core::ports::{PortError, PortResult, ProductRepository};
use shop_core::pricing;
use sqlx::{FromRow, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::basket::reprice_pending_lines;
use super::{like_pattern, pictures_for, port_error, DbAdapter, PictureTable};

const PRODUCT_COLUMNS: &str = "id, category_id, title, description, price, sale_price, \
                               product_type, color, size, created_at, updated_at";

#[derive(FromRow)]
struct ProductRecord {
    id: Uuid,
    category_id: Uuid,
    title: String,
    description: String,
    price: f64,
    sale_price: Option<f64>,
    product_type: String,
    color: Option<String>,
    size: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRecord {
    fn to_domain(self, picture_urls: Vec<String>) -> Product {
        Product {
            id: self.id,
            category_id: self.category_id,
            title: self.title,
            description: self.description,
            price: self.price,
            sale_price: self.sale_price,
            product_type: self.product_type,
            color: self.color,
            size: self.size,
            picture_urls,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Renders the sparse `UPDATE products` statement for the fields present in `patch`.
pub(crate) fn product_update_query(
    product_id: Uuid,
    patch: ProductPatch,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = now()");
    if let Some(title) = patch.title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(description) = patch.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(price) = patch.price {
        qb.push(", price = ").push_bind(price);
    }
    if let Some(sale_price) = patch.sale_price {
        qb.push(", sale_price = ").push_bind(sale_price);
    }
    if let Some(product_type) = patch.product_type {
        qb.push(", product_type = ").push_bind(product_type);
    }
    if let Some(color) = patch.color {
        qb.push(", color = ").push_bind(color);
    }
    if let Some(size) = patch.size {
        qb.push(", size = ").push_bind(size);
    }
    qb.push(" WHERE id = ")
        .push_bind(product_id)
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(PRODUCT_COLUMNS);
    qb
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(title) = &filter.title {
        qb.push(" AND title ILIKE ").push_bind(like_pattern(title));
    }
    if let Some(price_from) = filter.price_from {
        qb.push(" AND price >= ").push_bind(price_from);
    }
    if let Some(price_to) = filter.price_to {
        qb.push(" AND price <= ").push_bind(price_to);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(product_type) = &filter.product_type {
        qb.push(" AND product_type = ").push_bind(product_type.clone());
    }
}

async fn fetch_live_product<'e, E>(executor: E, product_id: Uuid) -> PortResult<ProductRecord>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL",
        PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, ProductRecord>(&sql)
        .bind(product_id)
        .fetch_one(executor)
        .await
        .map_err(|e| port_error(e, "product"))
}

#[async_trait]
impl ProductRepository for DbAdapter {
    #[tracing::instrument(skip(self, product), fields(title = %product.title))]
    async fn create_product(&self, product: NewProduct) -> PortResult<Product> {
        product.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "product"))?;

        let category_live: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(product.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| port_error(e, "category"))?;
        if !category_live {
            return Err(PortError::NotFound("category not found".to_string()));
        }

        let sql = format!(
            "INSERT INTO products (id, category_id, title, description, price, sale_price, product_type, color, size) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let record = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(product.category_id)
            .bind(&product.title)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.sale_price)
            .bind(&product.product_type)
            .bind(&product.color)
            .bind(&product.size)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| port_error(e, "product"))?;

        let mut picture_urls = Vec::new();
        if let Some(url) = product.picture_url {
            sqlx::query("INSERT INTO product_pictures (id, product_id, picture_url) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(record.id)
                .bind(&url)
                .execute(&mut *tx)
                .await
                .map_err(|e| port_error(e, "picture"))?;
            picture_urls.push(url);
        }

        tx.commit().await.map_err(|e| port_error(e, "product"))?;
        Ok(record.to_domain(picture_urls))
    }

    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        let record = fetch_live_product(&self.pool, product_id).await?;
        let mut pictures = pictures_for(&self.pool, PictureTable::Product, &[record.id]).await?;
        let urls = pictures.remove(&record.id).unwrap_or_default();
        Ok(record.to_domain(urls))
    }

    #[tracing::instrument(skip(self))]
    async fn list_products(&self, filter: ProductFilter) -> PortResult<ProductList> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(PRODUCT_COLUMNS).push(" FROM products");
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());
        let records = qb
            .build_query_as::<ProductRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| port_error(e, "product"))?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filter(&mut count, &filter);
        let total_count: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "product"))?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut pictures = pictures_for(&self.pool, PictureTable::Product, &ids).await?;
        let products = records
            .into_iter()
            .map(|r| {
                let urls = pictures.remove(&r.id).unwrap_or_default();
                r.to_domain(urls)
            })
            .collect();

        Ok(ProductList {
            products,
            total_count,
            pagination: filter.pagination,
        })
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_product(&self, product_id: Uuid, patch: ProductPatch) -> PortResult<Product> {
        if patch.is_empty() {
            return Err(PortError::BadRequest("no fields to update".to_string()));
        }
        patch.validate()?;
        let reprice = patch.changes_price();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "product"))?;

        let mut qb = product_update_query(product_id, patch);
        let record = qb
            .build_query_as::<ProductRecord>()
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| port_error(e, "product"))?;

        if reprice {
            let unit_price = pricing::final_unit_price(record.price, record.sale_price);
            let repriced = reprice_pending_lines(&mut *tx, record.id, unit_price).await?;
            tracing::debug!(product_id = %record.id, repriced, "Re-priced open basket lines");
        }

        let mut pictures = pictures_for(&mut *tx, PictureTable::Product, &[record.id]).await?;
        tx.commit().await.map_err(|e| port_error(e, "product"))?;

        let urls = pictures.remove(&record.id).unwrap_or_default();
        Ok(record.to_domain(urls))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "product"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("product not found".to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn add_picture(&self, picture: PictureLink) -> PortResult<()> {
        let result = sqlx::query(
            "INSERT INTO product_pictures (id, product_id, picture_url) \
             SELECT $1, id, $3 FROM products WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(Uuid::new_v4())
        .bind(picture.owner_id)
        .bind(&picture.picture_url)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "picture"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("product not found".to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_picture(&self, picture: PictureLink) -> PortResult<()> {
        let result = sqlx::query(
            "DELETE FROM product_pictures WHERE product_id = $1 AND picture_url = $2",
        )
        .bind(picture.owner_id)
        .bind(&picture.picture_url)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "picture"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("picture not found".to_string()));
        }
        Ok(())
    }
}
