use super::{media::MediaRow, PostgresRepository};
use crate::core::{
    entities::{
        normalize_hashtags, Comment, CreatePost, Hashtag, Media, Post, UpdatePost,
    },
    error::{Error, Result},
    repository::{PostRepository, TOP_HASHTAGS},
};
use sqlx::{query, query_as, query_scalar, Postgres, QueryBuilder, Transaction};

const POST_COLUMNS: &str = "p.post_id, p.username, p.post_description, p.audio_id, \
    p.like_count, p.is_private, p.created_at";

const COMMENT_COLUMNS: &str = "comment_id, username, post_id, comment_text, created_at";

async fn insert_hashtags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: i64,
    hashtags: &[String],
) -> Result<()> {
    let hashtags = normalize_hashtags(hashtags);
    if hashtags.is_empty() {
        return Ok(());
    }
    query("INSERT INTO hashtag (hashtag, post_id) SELECT UNNEST($1::VARCHAR[]), $2")
        .bind(&hashtags)
        .bind(post_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            Error::database(format!("failed to tag post {}", post_id), e)
        })?;
    Ok(())
}

impl PostRepository for PostgresRepository {
    async fn create_post(&self, post: &CreatePost) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        let post_id = query_scalar::<_, i64>(
            "INSERT INTO post (username, post_description, audio_id)
            VALUES ($1, $2, $3)
            RETURNING post_id",
        )
        .bind(&post.username)
        .bind(&post.description)
        .bind(post.audio_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            Error::database(format!("failed to create post for {}", post.username), e)
        })?;
        insert_hashtags(&mut tx, post_id, &post.hashtags).await?;
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit post".into(), e))?;
        Ok(post_id)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        query_as::<_, Post>(&format!(
            "SELECT {} FROM post AS p WHERE p.post_id = $1",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get post {}", post_id), e))
    }

    async fn posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>> {
        query_as::<_, Post>(&format!(
            "SELECT {} FROM post AS p
            ORDER BY p.created_at DESC, p.post_id DESC
            LIMIT $1 OFFSET $2",
            POST_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database("failed to list posts".into(), e))
    }

    async fn user_posts(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        query_as::<_, Post>(&format!(
            "SELECT {} FROM post AS p
            WHERE p.username = $1
            ORDER BY p.created_at DESC, p.post_id DESC
            LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to list posts of {}", username), e))
    }

    async fn post_count(&self, username: &str) -> Result<i64> {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM post WHERE username = $1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to count posts of {}", username), e))
    }

    async fn posts_by_hashtags(&self, hashtags: &[String]) -> Result<Vec<Post>> {
        let hashtags = normalize_hashtags(hashtags);
        if hashtags.is_empty() {
            return Ok(vec![]);
        }
        query_as::<_, Post>(&format!(
            "SELECT {} FROM post AS p
            WHERE p.post_id IN (SELECT post_id FROM hashtag WHERE hashtag = ANY($1))
            ORDER BY p.created_at DESC, p.post_id DESC",
            POST_COLUMNS
        ))
        .bind(&hashtags)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database("failed to search posts by hashtag".into(), e))
    }

    async fn home_feed(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        query_as::<_, Post>(&format!(
            "SELECT {} FROM post AS p
            WHERE p.username = $1
                OR p.username IN (
                    SELECT followee FROM follower_relationships WHERE follower = $1
                )
            ORDER BY p.created_at DESC, p.post_id DESC
            LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to build home feed of {}", username), e))
    }

    async fn recommended_feed(&self, username: &str, limit: i64, offset: i64) -> Result<Vec<Post>> {
        query_as::<_, Post>(&format!(
            "WITH top_hashtags AS (
                SELECT h.hashtag
                FROM user_liked_relationships AS l
                JOIN hashtag AS h ON h.post_id = l.post_id
                WHERE l.username = $1
                GROUP BY h.hashtag
                ORDER BY COUNT(*) DESC, h.hashtag ASC
                LIMIT $4
            )
            SELECT {} FROM post AS p
            WHERE p.username <> $1
            ORDER BY
                CASE WHEN EXISTS (
                    SELECT 1 FROM hashtag AS h
                    WHERE h.post_id = p.post_id
                        AND h.hashtag IN (SELECT hashtag FROM top_hashtags)
                ) THEN 1 ELSE 2 END,
                p.created_at DESC,
                p.post_id DESC
            LIMIT $2 OFFSET $3",
            POST_COLUMNS
        ))
        .bind(username)
        .bind(limit)
        .bind(offset)
        .bind(TOP_HASHTAGS)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::database(format!("failed to build recommended feed of {}", username), e)
        })
    }

    async fn update_post(&self, post_id: i64, update: &UpdatePost) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        let locked = query_scalar::<_, i64>("SELECT post_id FROM post WHERE post_id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::database(format!("failed to get post {}", post_id), e))?;
        if locked.is_none() {
            return Err(Error::not_found(format!("post not found: {}", post_id)));
        }
        if update.description.is_some() || update.audio_id.is_some() || update.is_private.is_some() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE post SET ");
            let mut fields = builder.separated(", ");
            if let Some(description) = &update.description {
                fields.push("post_description = ").push_bind_unseparated(description);
            }
            if let Some(audio_id) = update.audio_id {
                fields.push("audio_id = ").push_bind_unseparated(audio_id);
            }
            if let Some(is_private) = update.is_private {
                fields.push("is_private = ").push_bind_unseparated(is_private);
            }
            builder.push(" WHERE post_id = ").push_bind(post_id);
            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::database(format!("failed to update post {}", post_id), e))?;
        }
        if let Some(hashtags) = &update.hashtags {
            query("DELETE FROM hashtag WHERE post_id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::database(format!("failed to clear hashtags of post {}", post_id), e)
                })?;
            insert_hashtags(&mut tx, post_id, hashtags).await?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit post update".into(), e))?;
        Ok(())
    }

    async fn delete_post(&self, post_id: i64) -> Result<Vec<Media>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        let media = query_as::<_, MediaRow>(
            "SELECT media_id, post_id, file_name, extension_name, media_type
            FROM media WHERE post_id = $1",
        )
        .bind(post_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| Error::database(format!("failed to get media of post {}", post_id), e))?
        .into_iter()
        .map(MediaRow::into_media)
        .collect::<Result<Vec<Media>>>()?;
        let result = query("DELETE FROM post WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::database(format!("failed to delete post {}", post_id), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("post not found: {}", post_id)));
        }
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit post deletion".into(), e))?;
        Ok(media)
    }

    async fn hashtags_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Hashtag>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }
        query_as::<_, Hashtag>(
            "SELECT post_id, hashtag FROM hashtag WHERE post_id = ANY($1) ORDER BY post_id, hashtag",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database("failed to get hashtags".into(), e))
    }

    async fn like_post(&self, username: &str, post_id: i64) -> Result<i32> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        query("INSERT INTO user_liked_relationships (username, post_id) VALUES ($1, $2)")
            .bind(username)
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::database(format!("failed to like post {} as {}", post_id, username), e)
            })?;
        let like_count = query_scalar::<_, i32>(
            "UPDATE post SET like_count = like_count + 1 WHERE post_id = $1 RETURNING like_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::database(format!("failed to count like of post {}", post_id), e))?;
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit like".into(), e))?;
        Ok(like_count)
    }

    async fn unlike_post(&self, username: &str, post_id: i64) -> Result<i32> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        let result = query(
            "DELETE FROM user_liked_relationships WHERE username = $1 AND post_id = $2",
        )
        .bind(username)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::database(format!("failed to unlike post {} as {}", post_id, username), e)
        })?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!(
                "{} has not liked post {}",
                username, post_id
            )));
        }
        let like_count = query_scalar::<_, i32>(
            "UPDATE post SET like_count = GREATEST(like_count - 1, 0)
            WHERE post_id = $1
            RETURNING like_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::database(format!("failed to count like of post {}", post_id), e))?;
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit unlike".into(), e))?;
        Ok(like_count)
    }

    async fn liked_users(&self, post_id: i64) -> Result<Vec<String>> {
        query_scalar::<_, String>(
            "SELECT username FROM user_liked_relationships WHERE post_id = $1 ORDER BY username",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get likes of post {}", post_id), e))
    }

    async fn liked_posts(&self, username: &str) -> Result<Vec<i64>> {
        query_scalar::<_, i64>(
            "SELECT post_id FROM user_liked_relationships WHERE username = $1 ORDER BY post_id",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get likes of {}", username), e))
    }

    async fn create_comment(&self, username: &str, post_id: i64, text: &str) -> Result<i64> {
        query_scalar::<_, i64>(
            "INSERT INTO comment (username, post_id, comment_text)
            VALUES ($1, $2, $3)
            RETURNING comment_id",
        )
        .bind(username)
        .bind(post_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to comment on post {}", post_id), e))
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Option<Comment>> {
        query_as::<_, Comment>(&format!(
            "SELECT {} FROM comment WHERE comment_id = $1",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get comment {}", comment_id), e))
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        query_as::<_, Comment>(&format!(
            "SELECT {} FROM comment WHERE post_id = $1 ORDER BY comment_id",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get comments of post {}", post_id), e))
    }

    async fn comments_by_user(&self, username: &str) -> Result<Vec<Comment>> {
        query_as::<_, Comment>(&format!(
            "SELECT {} FROM comment WHERE username = $1 ORDER BY comment_id DESC",
            COMMENT_COLUMNS
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get comments of {}", username), e))
    }

    async fn comment_count(&self, post_id: i64) -> Result<i64> {
        query_scalar::<_, i64>("SELECT COUNT(*) FROM comment WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to count comments of post {}", post_id), e)
            })
    }

    async fn update_comment(&self, comment_id: i64, text: &str) -> Result<()> {
        let result = query("UPDATE comment SET comment_text = $1 WHERE comment_id = $2")
            .bind(text)
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to update comment {}", comment_id), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("comment not found: {}", comment_id)));
        }
        Ok(())
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<()> {
        let result = query("DELETE FROM comment WHERE comment_id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to delete comment {}", comment_id), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("comment not found: {}", comment_id)));
        }
        Ok(())
    }
}
