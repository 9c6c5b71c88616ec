use crate::core::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt::Display, str::FromStr};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub new_username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.new_username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Profile {
    pub username: String,
    pub name: String,
    pub profile_picture_url: String,
    pub bio: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub bio: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.profile_picture_url.is_none()
            && self.bio.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Post {
    pub post_id: i64,
    pub username: String,
    #[sqlx(rename = "post_description")]
    pub description: String,
    pub audio_id: Option<i64>,
    pub like_count: i32,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePost {
    pub username: String,
    pub description: String,
    pub audio_id: Option<i64>,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub description: Option<String>,
    pub audio_id: Option<i64>,
    pub is_private: Option<bool>,
    pub hashtags: Option<Vec<String>>,
}

impl UpdatePost {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.audio_id.is_none()
            && self.is_private.is_none()
            && self.hashtags.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Hashtag {
    pub post_id: i64,
    pub hashtag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Comment {
    pub comment_id: i64,
    pub username: String,
    pub post_id: i64,
    #[serde(rename = "text")]
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Photo => "photo",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(MediaType::Photo),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            other => Err(Error::bad_request(format!(
                "invalid media type: {} (expected photo, video or audio)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Media {
    pub media_id: i64,
    pub post_id: i64,
    pub file_name: String,
    pub extension_name: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone)]
pub struct CreateMedia {
    pub post_id: i64,
    pub file_name: String,
    pub extension_name: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMedia {
    pub file_name: Option<String>,
    pub extension_name: Option<String>,
    pub media_type: Option<MediaType>,
}

impl UpdateMedia {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none()
            && self.extension_name.is_none()
            && self.media_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Photo {
    pub media_id: i64,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Video {
    pub media_id: i64,
    pub duration: f64,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Audio {
    pub media_id: i64,
    pub duration: f64,
    pub bitrate: i32,
}

/// Trims, strips a leading `#`, lower-cases and de-duplicates hashtags,
/// keeping first-seen order.
pub fn normalize_hashtags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim().trim_start_matches('#').trim();
        if tag.is_empty() {
            continue;
        }
        let tag = tag.to_lowercase();
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
