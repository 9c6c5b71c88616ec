//! Upload pipeline tying object storage, metadata extraction and the
//! media tables together.

use crate::{
    core::{
        entities::{Audio, CreateMedia, Media, MediaType, Photo, Video},
        error::{Error, Result},
        repository::{MediaRepository, PostRepository},
        storage::{extension, fresh_file_name, ObjectStorage},
    },
    metadata::{self, MediaMetadata},
};

/// Stores `data` under a fresh object name and records it against the post.
///
/// The object is uploaded before any row is written. If recording fails the
/// rows written so far and the uploaded object are removed again.
pub async fn attach_media<R, S>(
    repository: &R,
    storage: &S,
    post_id: i64,
    media_type: MediaType,
    original_name: &str,
    data: Vec<u8>,
) -> Result<Media>
where
    R: PostRepository + MediaRepository,
    S: ObjectStorage,
{
    if data.is_empty() {
        return Err(Error::bad_request("uploaded file is empty"));
    }
    if repository.get_post(post_id).await?.is_none() {
        return Err(Error::not_found(format!("post not found: {}", post_id)));
    }

    let extension_name = extension(original_name);
    let file_name = fresh_file_name(original_name);

    let details = read_metadata(media_type, &extension_name, &data).await?;
    storage.upload(media_type, &file_name, data).await?;

    let media = CreateMedia {
        post_id,
        file_name: file_name.clone(),
        extension_name,
        media_type,
    };
    match record(repository, &media, details).await {
        Ok(media_id) => Ok(Media {
            media_id,
            post_id,
            file_name,
            extension_name: media.extension_name,
            media_type,
        }),
        Err(err) => {
            if let Err(cleanup) = storage.delete(media_type, &file_name).await {
                log::error!(
                    "failed to remove orphaned object {}/{}: {}",
                    media_type,
                    file_name,
                    cleanup
                );
            }
            Err(err)
        }
    }
}

async fn read_metadata(
    media_type: MediaType,
    extension_name: &str,
    data: &[u8],
) -> Result<MediaMetadata> {
    let suffix = if extension_name.is_empty() {
        String::new()
    } else {
        format!(".{}", extension_name)
    };
    let file = tempfile::Builder::new()
        .prefix("arthouse-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| Error::wrap("failed to create temporary file".into(), 500, e))?;
    tokio::fs::write(file.path(), data)
        .await
        .map_err(|e| Error::wrap("failed to write temporary file".into(), 500, e))?;
    metadata::extract(media_type, file.path()).await
}

async fn record<R>(
    repository: &R,
    media: &CreateMedia,
    details: MediaMetadata,
) -> Result<i64>
where
    R: MediaRepository,
{
    let media_id = repository.create_media(media).await?;
    let recorded = match details {
        MediaMetadata::Photo { width, height } => {
            repository
                .create_photo(&Photo {
                    media_id,
                    width,
                    height,
                })
                .await
        }
        MediaMetadata::Video {
            duration,
            width,
            height,
        } => {
            repository
                .create_video(&Video {
                    media_id,
                    duration,
                    width,
                    height,
                })
                .await
        }
        MediaMetadata::Audio { duration, bitrate } => {
            repository
                .create_audio(&Audio {
                    media_id,
                    duration,
                    bitrate,
                })
                .await
        }
    };
    if let Err(err) = recorded {
        if let Err(cleanup) = repository.delete_media(media_id).await {
            log::error!("failed to remove media row {}: {}", media_id, cleanup);
        }
        return Err(err);
    }
    Ok(media_id)
}

/// Deletes the stored objects behind already removed media rows. Failures
/// are logged and skipped.
pub async fn remove_objects<S: ObjectStorage>(storage: &S, media: &[Media]) {
    for m in media {
        if let Err(err) = storage.delete(m.media_type, &m.file_name).await {
            log::warn!(
                "failed to delete object {}/{} of media {}: {}",
                m.media_type,
                m.file_name,
                m.media_id,
                err
            );
        }
    }
}
