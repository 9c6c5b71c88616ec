use super::Repository;
use crate::{
    core::{
        entities::{normalize_hashtags, CreatePost, Media, Post, UpdatePost},
        error::{Error, Result},
        media::remove_objects,
        storage::ObjectStorage,
    },
    utils::{Pagination, UserID},
};
use actix_web::{
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Default page size of the recommendation feed.
const RECOMMENDED_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub(crate) struct PostView {
    #[serde(flatten)]
    post: Post,
    hashtags: Vec<String>,
    media: Vec<Media>,
}

/// Attaches hashtags and media to a page of posts, keeping the page order.
pub(crate) async fn post_views<R: Repository>(
    repository: &R,
    posts: Vec<Post>,
) -> Result<Vec<PostView>> {
    let ids: Vec<i64> = posts.iter().map(|p| p.post_id).collect();
    let mut hashtags: HashMap<i64, Vec<String>> = HashMap::new();
    for h in repository.hashtags_for_posts(&ids).await? {
        hashtags.entry(h.post_id).or_default().push(h.hashtag);
    }
    let mut media: HashMap<i64, Vec<Media>> = HashMap::new();
    for m in repository.media_for_posts(&ids).await? {
        media.entry(m.post_id).or_default().push(m);
    }
    Ok(posts
        .into_iter()
        .map(|post| PostView {
            hashtags: hashtags.remove(&post.post_id).unwrap_or_default(),
            media: media.remove(&post.post_id).unwrap_or_default(),
            post,
        })
        .collect())
}

async fn owned_post<R: Repository>(repository: &R, user_id: &UserID, post_id: i64) -> Result<Post> {
    let post = repository
        .get_post(post_id)
        .await?
        .ok_or(Error::not_found(format!("post not found: {}", post_id)))?;
    user_id.ensure(&post.username)?;
    Ok(post)
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewPost {
    username: String,
    #[serde(default, alias = "caption")]
    description: String,
    #[serde(default)]
    hashtags: Vec<String>,
    audio_id: Option<i64>,
}

pub(crate) async fn create_post<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    Json(NewPost {
        username,
        description,
        hashtags,
        audio_id,
    }): Json<NewPost>,
) -> Result<HttpResponse> {
    user_id.ensure(&username)?;
    let post_id = repository
        .create_post(&CreatePost {
            username,
            description,
            audio_id,
            hashtags,
        })
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "post_id": post_id })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListPosts {
    username: Option<String>,
    feed: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

pub(crate) async fn list_posts<R: Repository>(
    repository: Data<R>,
    Query(ListPosts {
        username,
        feed,
        limit,
        offset,
    }): Query<ListPosts>,
) -> Result<HttpResponse> {
    let page = Pagination { limit, offset };
    let posts = match (feed.as_deref(), username.as_deref()) {
        (Some("home"), Some(username)) => {
            repository
                .home_feed(username, page.limit(), page.offset())
                .await?
        }
        (Some("recommended"), Some(username)) => {
            repository
                .recommended_feed(username, page.limit_or(RECOMMENDED_LIMIT), page.offset())
                .await?
        }
        (Some("home" | "recommended"), None) => {
            return Err(Error::bad_request("a feed requires a username"));
        }
        (Some(other), _) => {
            return Err(Error::bad_request(format!("unknown feed: {}", other)));
        }
        (None, Some(username)) => {
            repository
                .user_posts(username, page.limit(), page.offset())
                .await?
        }
        (None, None) => repository.posts(page.limit(), page.offset()).await?,
    };
    let posts = post_views(repository.get_ref(), posts).await?;
    Ok(HttpResponse::Ok().json(json!({ "posts": posts })))
}

#[derive(Debug, Serialize)]
struct PostDetail {
    #[serde(flatten)]
    view: PostView,
    comment_count: i64,
}

pub(crate) async fn get_post<R: Repository>(
    repository: Data<R>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = repository
        .get_post(post_id)
        .await?
        .ok_or(Error::not_found(format!("post not found: {}", post_id)))?;
    let comment_count = repository.comment_count(post_id).await?;
    let view = post_views(repository.get_ref(), vec![post])
        .await?
        .pop()
        .ok_or(Error::internal("post view went missing"))?;
    Ok(HttpResponse::Ok().json(PostDetail {
        view,
        comment_count,
    }))
}

pub(crate) async fn update_post<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    post_id: Path<i64>,
    Json(update): Json<UpdatePost>,
) -> Result<HttpResponse> {
    let post = owned_post(repository.get_ref(), &user_id, post_id.into_inner()).await?;
    repository.update_post(post.post_id, &update).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub(crate) async fn delete_post<R: Repository, S: ObjectStorage>(
    user_id: UserID,
    repository: Data<R>,
    storage: Data<S>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let post = owned_post(repository.get_ref(), &user_id, post_id.into_inner()).await?;
    let media = repository.delete_post(post.post_id).await?;
    remove_objects(storage.get_ref(), &media).await;
    log::info!(
        "deleted post {} of {} with {} media",
        post.post_id,
        post.username,
        media.len()
    );
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub(crate) async fn like_post<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let like_count = repository.like_post(&user_id.0, post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "like_count": like_count })))
}

pub(crate) async fn unlike_post<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let like_count = repository
        .unlike_post(&user_id.0, post_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "like_count": like_count })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct HashtagSearch {
    #[serde(default)]
    tags: String,
}

pub(crate) async fn search_hashtags<R: Repository>(
    repository: Data<R>,
    Query(HashtagSearch { tags }): Query<HashtagSearch>,
) -> Result<HttpResponse> {
    let tags = normalize_hashtags(&tags.split(',').collect::<Vec<_>>());
    if tags.is_empty() {
        return Err(Error::bad_request("no hashtags given"));
    }
    let posts = repository.posts_by_hashtags(&tags).await?;
    let posts = post_views(repository.get_ref(), posts).await?;
    Ok(HttpResponse::Ok().json(json!({ "posts": posts })))
}
