use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::domain::{NewPost, PictureLink, Post, PostFilter, PostList, PostPatch};
use shop_core::ports::{PortError, PortResult, PostRepository};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, pictures_for, port_error, DbAdapter, PictureTable};

#[derive(FromRow)]
struct PostRecord {
    id: Uuid,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRecord {
    fn to_domain(self, picture_urls: Vec<String>) -> Post {
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            picture_urls,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(title) = &filter.title {
        qb.push(" AND title ILIKE ").push_bind(like_pattern(title));
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
}

#[async_trait]
impl PostRepository for DbAdapter {
    #[tracing::instrument(skip(self, post), fields(title = %post.title))]
    async fn create_post(&self, post: NewPost) -> PortResult<Post> {
        if post.title.trim().is_empty() {
            return Err(PortError::BadRequest("title is required".to_string()));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| port_error(e, "post"))?;

        let record = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts (id, title, content) VALUES ($1, $2, $3) \
             RETURNING id, title, content, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&post.title)
        .bind(&post.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| port_error(e, "post"))?;

        let mut picture_urls = Vec::new();
        if let Some(url) = post.picture_url {
            sqlx::query("INSERT INTO post_pictures (id, post_id, picture_url) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(record.id)
                .bind(&url)
                .execute(&mut *tx)
                .await
                .map_err(|e| port_error(e, "picture"))?;
            picture_urls.push(url);
        }

        tx.commit().await.map_err(|e| port_error(e, "post"))?;
        Ok(record.to_domain(picture_urls))
    }

    #[tracing::instrument(skip(self))]
    async fn get_post(&self, post_id: Uuid) -> PortResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "SELECT id, title, content, created_at, updated_at FROM posts \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "post"))?;
        let mut pictures = pictures_for(&self.pool, PictureTable::Post, &[record.id]).await?;
        let urls = pictures.remove(&record.id).unwrap_or_default();
        Ok(record.to_domain(urls))
    }

    #[tracing::instrument(skip(self))]
    async fn list_posts(&self, filter: PostFilter) -> PortResult<PostList> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT id, title, content, created_at, updated_at FROM posts");
        push_filter(&mut qb, &filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());
        let records = qb
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| port_error(e, "post"))?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_filter(&mut count, &filter);
        let total_count: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "post"))?;

        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let mut pictures = pictures_for(&self.pool, PictureTable::Post, &ids).await?;
        let posts = records
            .into_iter()
            .map(|r| {
                let urls = pictures.remove(&r.id).unwrap_or_default();
                r.to_domain(urls)
            })
            .collect();

        Ok(PostList {
            posts,
            total_count,
            pagination: filter.pagination,
        })
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> PortResult<Post> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE posts SET updated_at = now()");
        if let Some(title) = patch.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(content) = patch.content {
            qb.push(", content = ").push_bind(content);
        }
        qb.push(" WHERE id = ")
            .push_bind(post_id)
            .push(" AND deleted_at IS NULL RETURNING id, title, content, created_at, updated_at");

        let record = qb
            .build_query_as::<PostRecord>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| port_error(e, "post"))?;
        let mut pictures = pictures_for(&self.pool, PictureTable::Post, &[record.id]).await?;
        let urls = pictures.remove(&record.id).unwrap_or_default();
        Ok(record.to_domain(urls))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_post(&self, post_id: Uuid) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE posts SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
                .bind(post_id)
                .execute(&self.pool)
                .await
                .map_err(|e| port_error(e, "post"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("post not found".to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn add_post_picture(&self, picture: PictureLink) -> PortResult<()> {
        let result = sqlx::query(
            "INSERT INTO post_pictures (id, post_id, picture_url) \
             SELECT $1, id, $3 FROM posts WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(Uuid::new_v4())
        .bind(picture.owner_id)
        .bind(&picture.picture_url)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "picture"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("post not found".to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_post_picture(&self, picture: PictureLink) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM post_pictures WHERE post_id = $1 AND picture_url = $2")
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
