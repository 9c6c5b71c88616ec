use super::Repository;
use crate::{
    core::{
        entities::MediaType,
        error::{Error, Result},
        media::attach_media,
        storage::{fresh_file_name, Method, ObjectStorage},
    },
    utils::UserID,
};
use actix_multipart::Multipart;
use actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Upper bound for a single uploaded file.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Serialize)]
struct MediaUrl {
    media_id: i64,
    media_type: MediaType,
    file_name: String,
    url: String,
}

pub(crate) async fn media_urls<R: Repository, S: ObjectStorage>(
    repository: Data<R>,
    storage: Data<S>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    if repository.get_post(post_id).await?.is_none() {
        return Err(Error::not_found(format!("post not found: {}", post_id)));
    }
    let media = repository
        .media_by_post(post_id)
        .await?
        .into_iter()
        .map(|m| {
            let signed = storage.signed_url(Method::Get, m.media_type, &m.file_name)?;
            Ok(MediaUrl {
                media_id: m.media_id,
                media_type: m.media_type,
                file_name: m.file_name,
                url: signed.url,
            })
        })
        .collect::<Result<Vec<MediaUrl>>>()?;
    Ok(HttpResponse::Ok().json(json!({ "post_id": post_id, "media": media })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadUrl {
    file_name: String,
    media_type: String,
}

pub(crate) async fn upload_url<S: ObjectStorage>(
    _user_id: UserID,
    storage: Data<S>,
    Json(UploadUrl {
        file_name,
        media_type,
    }): Json<UploadUrl>,
) -> Result<HttpResponse> {
    let media_type = media_type.parse::<MediaType>()?;
    // Only the extension of the client's name is kept.
    let file_name = fresh_file_name(&file_name);
    let signed = storage.signed_url(Method::Put, media_type, &file_name)?;
    Ok(HttpResponse::Ok().json(signed))
}

fn multipart_error(e: actix_multipart::MultipartError) -> Error {
    Error::wrap("invalid multipart body".into(), 400, e.to_string())
}

/// Accepts `post_id`, `media_type` and `file` form fields, stores the file
/// and records it against the post.
pub(crate) async fn upload<R: Repository, S: ObjectStorage>(
    user_id: UserID,
    repository: Data<R>,
    storage: Data<S>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut post_id: Option<i64> = None;
    let mut media_type: Option<MediaType> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().to_owned();
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(|f| f.to_owned());
        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(Error::new(
                    format!("file exceeds {} bytes", MAX_UPLOAD_BYTES),
                    413,
                ));
            }
            data.extend_from_slice(&chunk);
        }
        match name.as_str() {
            "post_id" => {
                let raw = String::from_utf8_lossy(&data);
                post_id = Some(raw.trim().parse().map_err(|_| {
                    Error::bad_request(format!("invalid post_id: {}", raw.trim()))
                })?);
            }
            "media_type" => {
                media_type = Some(String::from_utf8_lossy(&data).parse()?);
            }
            "file" => {
                file = Some((file_name.unwrap_or_default(), data));
            }
            other => log::debug!("ignoring multipart field {}", other),
        }
    }

    let post_id = post_id.ok_or(Error::bad_request("post_id is required"))?;
    let media_type = media_type.ok_or(Error::bad_request("media_type is required"))?;
    let (file_name, data) = file.ok_or(Error::bad_request("file is required"))?;

    let post = repository
        .get_post(post_id)
        .await?
        .ok_or(Error::not_found(format!("post not found: {}", post_id)))?;
    user_id.ensure(&post.username)?;

    let media = attach_media(
        repository.get_ref(),
        storage.get_ref(),
        post_id,
        media_type,
        &file_name,
        data,
    )
    .await?;
    log::info!(
        "uploaded {} {} for post {}",
        media.media_type,
        media.file_name,
        post_id
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "media_id": media.media_id,
        "file_name": media.file_name,
    })))
}
