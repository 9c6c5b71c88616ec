use super::Repository;
use crate::{
    core::{
        entities::Comment,
        error::{Error, Result},
    },
    utils::UserID,
};
use actix_web::{
    web::{Data, Json, Path},
    HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct CommentText {
    text: String,
}

impl CommentText {
    fn validated(&self) -> Result<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(Error::bad_request("comment must not be empty"));
        }
        Ok(text)
    }
}

async fn owned_comment<R: Repository>(
    repository: &R,
    user_id: &UserID,
    comment_id: i64,
) -> Result<Comment> {
    let comment = repository
        .get_comment(comment_id)
        .await?
        .ok_or(Error::not_found(format!("comment not found: {}", comment_id)))?;
    user_id.ensure(&comment.username)?;
    Ok(comment)
}

pub(crate) async fn post_comments<R: Repository>(
    repository: Data<R>,
    post_id: Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    if repository.get_post(post_id).await?.is_none() {
        return Err(Error::not_found(format!("post not found: {}", post_id)));
    }
    let comments = repository.comments_for_post(post_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "comments": comments })))
}

pub(crate) async fn create_comment<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    post_id: Path<i64>,
    Json(body): Json<CommentText>,
) -> Result<HttpResponse> {
    let comment_id = repository
        .create_comment(&user_id.0, post_id.into_inner(), body.validated()?)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "comment_id": comment_id })))
}

pub(crate) async fn update_comment<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    comment_id: Path<i64>,
    Json(body): Json<CommentText>,
) -> Result<HttpResponse> {
    let comment = owned_comment(repository.get_ref(), &user_id, comment_id.into_inner()).await?;
    repository
        .update_comment(comment.comment_id, body.validated()?)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub(crate) async fn delete_comment<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    comment_id: Path<i64>,
) -> Result<HttpResponse> {
    let comment = owned_comment(repository.get_ref(), &user_id, comment_id.into_inner()).await?;
    repository.delete_comment(comment.comment_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
