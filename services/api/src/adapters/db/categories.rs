use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{Category, CategoryFilter, CategoryList};
use shop_core::ports::{CategoryRepository, PortError, PortResult};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, port_error, DbAdapter};

#[derive(FromRow)]
struct CategoryRecord {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRecord {
    fn to_domain(self) -> Category {
        Category {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn validate_name(name: &str) -> PortResult<()> {
    if name.trim().is_empty() {
        return Err(PortError::BadRequest("name is required".to_string()));
    }
    Ok(())
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(name) = &filter.name {
        qb.push(" AND name ILIKE ").push_bind(like_pattern(name));
    }
}

#[async_trait]
impl CategoryRepository for DbAdapter {
    #[tracing::instrument(skip(self))]
    async fn create_category(&self, name: &str) -> PortResult<Category> {
        validate_name(name)?;
        let record = sqlx::query_as::<_, CategoryRecord>(
            "INSERT INTO categories (id, name) VALUES ($1, $2) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "category"))?;
        Ok(record.to_domain())
    }

    #[tracing::instrument(skip(self))]
    async fn get_category(&self, category_id: Uuid) -> PortResult<Category> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            "SELECT id, name, created_at, updated_at FROM categories \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "category"))?;
        Ok(record.to_domain())
    }

    #[tracing::instrument(skip(self))]
    async fn list_categories(&self, filter: CategoryFilter) -> PortResult<CategoryList> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, name, created_at, updated_at FROM categories",
        );
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());
        let records = qb
            .build_query_as::<CategoryRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| port_error(e, "category"))?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut count, &filter);
        let total_count: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "category"))?;

        Ok(CategoryList {
            categories: records.into_iter().map(CategoryRecord::to_domain).collect(),
            total_count,
            pagination: filter.pagination,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn update_category(&self, category_id: Uuid, name: &str) -> PortResult<Category> {
        validate_name(name)?;
        let record = sqlx::query_as::<_, CategoryRecord>(
            "UPDATE categories SET name = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(category_id)
        .bind(name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "category"))?;
        Ok(record.to_domain())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_category(&self, category_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(category_id)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "category"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("category not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::domain::Pagination;

    #[test]
    fn list_and_count_share_the_predicate() {
        let filter = CategoryFilter {
            name: Some("hat".to_string()),
            pagination: Pagination::default(),
        };
        let mut list = QueryBuilder::<Postgres>::new("SELECT id FROM categories");
        push_filter(&mut list, &filter);
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut count, &filter);

        let tail = " WHERE deleted_at IS NULL AND name ILIKE $1";
        assert!(list.sql().ends_with(tail));
        assert!(count.sql().ends_with(tail));
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(validate_name("  "), Err(PortError::BadRequest(_))));
        assert!(validate_name("Shoes").is_ok());
    }
}
