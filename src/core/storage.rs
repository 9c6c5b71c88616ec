use crate::core::{
    entities::MediaType,
    error::{Error, Result},
};
use serde::Serialize;
use std::{fmt::Display, path::Path};
use uuid::Uuid;

/// Lifetime of every signed URL handed out.
pub const SIGNED_URL_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub object: String,
    pub content_type: String,
    pub method: String,
    pub expires_in: u64,
}

pub trait ObjectStorage {
    fn signed_url(
        &self,
        method: Method,
        media_type: MediaType,
        file_name: &str,
    ) -> Result<SignedUrl>;
    async fn upload(
        &self,
        media_type: MediaType,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<()>;
    async fn delete(&self, media_type: MediaType, file_name: &str) -> Result<()>;
}

/// Object key inside the bucket: `<media_type>/<file_name>`.
pub fn object_name(media_type: MediaType, file_name: &str) -> Result<String> {
    let file_name = file_name.trim();
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(Error::bad_request(format!(
            "invalid file name: {:?}",
            file_name
        )));
    }
    Ok(format!("{}/{}", media_type, file_name))
}

/// Lower-cased extension without the dot, empty when there is none.
pub fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// A new object name `<uuid>.<ext>` keeping only the client's extension.
pub fn fresh_file_name(original_name: &str) -> String {
    match extension(original_name).as_str() {
        "" => Uuid::new_v4().to_string(),
        ext => format!("{}.{}", Uuid::new_v4(), ext),
    }
}

pub fn content_type(media_type: MediaType, file_name: &str) -> String {
    let ext = extension(file_name);
    let subtype = match (media_type, ext.as_str()) {
        (MediaType::Photo, "jpg") | (MediaType::Photo, "jpeg") => "jpeg",
        (MediaType::Photo, "svg") => "svg+xml",
        (MediaType::Photo, "tif") => "tiff",
        (MediaType::Video, "mov") => "quicktime",
        (MediaType::Video, "mkv") => "x-matroska",
        (MediaType::Video, "avi") => "x-msvideo",
        (MediaType::Video, "m4v") => "mp4",
        (MediaType::Audio, "mp3") => "mpeg",
        (MediaType::Audio, "m4a") => "mp4",
        (MediaType::Audio, "oga") => "ogg",
        (_, "") => return "application/octet-stream".into(),
        (_, ext) => ext,
    };
    let top = match media_type {
        MediaType::Photo => "image",
        MediaType::Video => "video",
        MediaType::Audio => "audio",
    };
    format!("{}/{}", top, subtype)
}
