//! services/api/src/adapters/db/mod.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of every repository port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`. Each entity lives in its own
//! submodule; they all implement their trait on the same `DbAdapter`.

mod basket;
mod categories;
mod orders;
mod posts;
mod products;
mod sessions;
mod users;

use shop_core::ports::PortError;
use shop_core::usecase::Repositories;
use sqlx::{FromRow, PgExecutor, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements all repository ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Builds the use-case facade with this adapter behind every repository.
    pub fn into_repositories(self) -> Repositories {
        let adapter = Arc::new(self);
        Repositories {
            users: adapter.clone(),
            sessions: adapter.clone(),
            categories: adapter.clone(),
            products: adapter.clone(),
            posts: adapter.clone(),
            basket: adapter.clone(),
            orders: adapter,
        }
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Maps a `sqlx` error onto the port taxonomy, naming the entity involved.
pub(crate) fn port_error(err: sqlx::Error, entity: &str) -> PortError {
    match &err {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} not found", entity)),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{} already exists", entity))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            PortError::BadRequest(format!("{} references a missing record", entity))
        }
        _ => PortError::Unexpected(format!("{}: {}", entity, err)),
    }
}

/// Wraps a user-supplied search term for `ILIKE`, escaping its wildcards.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PictureTable {
    Product,
    Post,
}

impl PictureTable {
    fn select_sql(self) -> &'static str {
        match self {
            PictureTable::Product => {
                "SELECT product_id AS owner_id, picture_url FROM product_pictures \
                 WHERE product_id = ANY($1) ORDER BY created_at"
            }
            PictureTable::Post => {
                "SELECT post_id AS owner_id, picture_url FROM post_pictures \
                 WHERE post_id = ANY($1) ORDER BY created_at"
            }
        }
    }
}

#[derive(FromRow)]
struct PictureRecord {
    owner_id: Uuid,
    picture_url: String,
}

/// Loads the pictures of many owners with a single query.
pub(crate) async fn pictures_for<'e, E>(
    executor: E,
    table: PictureTable,
    owner_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<String>>, PortError>
where
    E: PgExecutor<'e>,
{
    let mut pictures: HashMap<Uuid, Vec<String>> = HashMap::new();
    if owner_ids.is_empty() {
        return Ok(pictures);
    }

    let records = sqlx::query_as::<_, PictureRecord>(table.select_sql())
        .bind(owner_ids)
        .fetch_all(executor)
        .await
        .map_err(|e| port_error(e, "picture"))?;

    for record in records {
        pictures
            .entry(record.owner_id)
            .or_default()
            .push(record.picture_url);
    }
    Ok(pictures)
}
