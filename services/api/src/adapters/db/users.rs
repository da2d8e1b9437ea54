//! User rows. Reads skip soft-deleted users; the live-email unique index
//! turns duplicate registrations into `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{NewUser, User, UserCredentials, UserLookup, UserPatch};
use shop_core::ports::{PortError, PortResult, UserRepository};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{port_error, DbAdapter};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, phone_number, user_role, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    phone_number: String,
    user_role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn into_credentials(self) -> PortResult<UserCredentials> {
        let user = User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            user_role: self.user_role.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok(UserCredentials {
            user,
            password_hash: self.password_hash,
        })
    }

    fn to_domain(self) -> PortResult<User> {
        self.into_credentials().map(|creds| creds.user)
    }
}

/// Renders the sparse `UPDATE users` statement for the fields present in `patch`.
pub(crate) fn user_update_query(user_id: Uuid, patch: UserPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = now()");
    if let Some(first_name) = patch.first_name {
        qb.push(", first_name = ").push_bind(first_name);
    }
    if let Some(last_name) = patch.last_name {
        qb.push(", last_name = ").push_bind(last_name);
    }
    if let Some(email) = patch.email {
        qb.push(", email = ").push_bind(email);
    }
    if let Some(phone_number) = patch.phone_number {
        qb.push(", phone_number = ").push_bind(phone_number);
    }
    if let Some(password_hash) = patch.password_hash {
        qb.push(", password_hash = ").push_bind(password_hash);
    }
    qb.push(" WHERE id = ")
        .push_bind(user_id)
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(USER_COLUMNS);
    qb
}

#[async_trait]
impl UserRepository for DbAdapter {
    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, first_name, last_name, email, password_hash, phone_number, user_role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.phone_number)
            .bind(user.user_role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "user"))?;
        record.to_domain()
    }

    #[tracing::instrument(skip(self))]
    async fn get_user(&self, lookup: UserLookup) -> PortResult<User> {
        let record = match lookup {
            UserLookup::Id(id) => {
                let sql = format!(
                    "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
                    USER_COLUMNS
                );
                sqlx::query_as::<_, UserRecord>(&sql)
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
            }
            UserLookup::Email(email) => {
                let sql = format!(
                    "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
                    USER_COLUMNS
                );
                sqlx::query_as::<_, UserRecord>(&sql)
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| port_error(e, "user"))?;
        record.to_domain()
    }

    #[tracing::instrument(skip(self))]
    async fn get_credentials(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "user"))?
            .into_credentials()
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User> {
        if patch.is_empty() {
            return Err(PortError::BadRequest("no fields to update".to_string()));
        }
        let mut qb = user_update_query(user_id, patch);
        qb.build_query_as::<UserRecord>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "user"))?
            .to_domain()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "user"))?;

        let deleted = sqlx::query(
            "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| port_error(e, "user"))?;
        if deleted.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("user {} not found", user_id)));
        }

        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| port_error(e, "session"))?;

        tx.commit().await.map_err(|e| port_error(e, "user"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_binds_only_present_fields() {
        let patch = UserPatch {
            last_name: Some("Lovelace".to_string()),
            phone_number: Some("+100".to_string()),
            ..Default::default()
        };
        let qb = user_update_query(Uuid::nil(), patch);
        assert_eq!(
            qb.sql(),
            format!(
                "UPDATE users SET updated_at = now(), last_name = $1, phone_number = $2 \
                 WHERE id = $3 AND deleted_at IS NULL RETURNING {}",
                USER_COLUMNS
            )
        );
    }
}
