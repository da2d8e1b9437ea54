use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{NewSession, Session};
use shop_core::ports::{PortError, PortResult, SessionRepository};
use sqlx::FromRow;
use uuid::Uuid;

use super::{port_error, DbAdapter};

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    ip_address: String,
    user_agent: String,
    is_active: bool,
    expires_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            is_active: self.is_active,
            expires_at: self.expires_at,
            last_active_at: self.last_active_at,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl SessionRepository for DbAdapter {
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn create_session(&self, session: NewSession) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO sessions (id, user_id, ip_address, user_agent, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, ip_address, user_agent, is_active, expires_at, last_active_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session.user_id)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "session"))?;
        Ok(record.to_domain())
    }

    #[tracing::instrument(skip(self))]
    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, ip_address, user_agent, is_active, expires_at, last_active_at, created_at \
             FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "session"))?;
        Ok(record.to_domain())
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate_session(&self, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, last_active_at = now() WHERE id = $1",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "session"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("session not found".to_string()));
        }
        Ok(())
    }
}
