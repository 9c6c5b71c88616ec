use super::PostgresRepository;
use crate::core::{
    entities::{Audio, CreateMedia, Media, MediaType, Photo, UpdateMedia, Video},
    error::{Error, Result},
    repository::MediaRepository,
};
use sqlx::{query, query_as, query_scalar, FromRow, Postgres, QueryBuilder};

const MEDIA_COLUMNS: &str = "media_id, post_id, file_name, extension_name, media_type";

#[derive(Debug, FromRow)]
pub(super) struct MediaRow {
    media_id: i64,
    post_id: i64,
    file_name: String,
    extension_name: String,
    media_type: String,
}

impl MediaRow {
    pub(super) fn into_media(self) -> Result<Media> {
        let media_type = self.media_type.parse::<MediaType>().map_err(|e| {
            Error::wrap(
                format!("invalid media type stored for media {}", self.media_id),
                500,
                e.message,
            )
        })?;
        Ok(Media {
            media_id: self.media_id,
            post_id: self.post_id,
            file_name: self.file_name,
            extension_name: self.extension_name,
            media_type,
        })
    }
}

impl MediaRepository for PostgresRepository {
    async fn create_media(&self, media: &CreateMedia) -> Result<i64> {
        query_scalar::<_, i64>(
            "INSERT INTO media (post_id, file_name, extension_name, media_type)
            VALUES ($1, $2, $3, $4)
            RETURNING media_id",
        )
        .bind(media.post_id)
        .bind(&media.file_name)
        .bind(&media.extension_name)
        .bind(media.media_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::database(format!("failed to record media of post {}", media.post_id), e)
        })
    }

    async fn get_media(&self, media_id: i64) -> Result<Option<Media>> {
        query_as::<_, MediaRow>(&format!(
            "SELECT {} FROM media WHERE media_id = $1",
            MEDIA_COLUMNS
        ))
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get media {}", media_id), e))?
        .map(MediaRow::into_media)
        .transpose()
    }

    async fn media_by_post(&self, post_id: i64) -> Result<Vec<Media>> {
        self.media_for_posts(&[post_id]).await
    }

    async fn media_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Media>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }
        query_as::<_, MediaRow>(&format!(
            "SELECT {} FROM media WHERE post_id = ANY($1) ORDER BY media_id",
            MEDIA_COLUMNS
        ))
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database("failed to get media".into(), e))?
        .into_iter()
        .map(MediaRow::into_media)
        .collect()
    }

    async fn update_media(&self, media_id: i64, update: &UpdateMedia) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE media SET ");
        let mut fields = builder.separated(", ");
        if let Some(file_name) = &update.file_name {
            fields.push("file_name = ").push_bind_unseparated(file_name);
        }
        if let Some(extension_name) = &update.extension_name {
            fields.push("extension_name = ").push_bind_unseparated(extension_name);
        }
        if let Some(media_type) = update.media_type {
            fields.push("media_type = ").push_bind_unseparated(media_type.as_str());
        }
        builder.push(" WHERE media_id = ").push_bind(media_id);
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to update media {}", media_id), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("media not found: {}", media_id)));
        }
        Ok(())
    }

    async fn delete_media(&self, media_id: i64) -> Result<()> {
        let result = query("DELETE FROM media WHERE media_id = $1")
            .bind(media_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to delete media {}", media_id), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("media not found: {}", media_id)));
        }
        Ok(())
    }

    async fn create_photo(&self, photo: &Photo) -> Result<()> {
        query("INSERT INTO photo (media_id, width, height) VALUES ($1, $2, $3)")
            .bind(photo.media_id)
            .bind(photo.width)
            .bind(photo.height)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to record photo {}", photo.media_id), e)
            })?;
        Ok(())
    }

    async fn get_photo(&self, media_id: i64) -> Result<Option<Photo>> {
        query_as::<_, Photo>("SELECT media_id, width, height FROM photo WHERE media_id = $1")
            .bind(media_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to get photo {}", media_id), e))
    }

    async fn create_video(&self, video: &Video) -> Result<()> {
        query("INSERT INTO video (media_id, duration, width, height) VALUES ($1, $2, $3, $4)")
            .bind(video.media_id)
            .bind(video.duration)
            .bind(video.width)
            .bind(video.height)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to record video {}", video.media_id), e)
            })?;
        Ok(())
    }

    async fn get_video(&self, media_id: i64) -> Result<Option<Video>> {
        query_as::<_, Video>(
            "SELECT media_id, duration, width, height FROM video WHERE media_id = $1",
        )
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get video {}", media_id), e))
    }

    async fn create_audio(&self, audio: &Audio) -> Result<()> {
        query("INSERT INTO audio (media_id, duration, bitrate) VALUES ($1, $2, $3)")
            .bind(audio.media_id)
            .bind(audio.duration)
            .bind(audio.bitrate)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to record audio {}", audio.media_id), e)
            })?;
        Ok(())
    }

    async fn get_audio(&self, media_id: i64) -> Result<Option<Audio>> {
        query_as::<_, Audio>("SELECT media_id, duration, bitrate FROM audio WHERE media_id = $1")
            .bind(media_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to get audio {}", media_id), e))
    }
}
