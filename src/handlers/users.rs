use super::{posts::post_views, public_failure, Repository};
use crate::{
    core::{
        auth::AuthService,
        entities::{UpdateProfile, UpdateUser},
        error::{Error, Result},
        hasher::Hasher,
        token_manager::TokenManager,
    },
    utils::{Pagination, UserID},
};
use actix_web::{
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

pub(crate) async fn get_user<R: Repository>(
    repository: Data<R>,
    username: Path<String>,
) -> Result<HttpResponse> {
    let profile = repository
        .get_profile(&username)
        .await?
        .ok_or(Error::not_found("User not found"))?;
    let followers = repository.followers(&username).await?;
    let following = repository.following(&username).await?;
    let post_count = repository.post_count(&username).await?;
    Ok(HttpResponse::Ok().json(json!({
        "username": profile.username,
        "name": profile.name,
        "bio": profile.bio,
        "profile_picture_url": profile.profile_picture_url,
        "follower_count": followers.len(),
        "following_count": following.len(),
        "post_count": post_count,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateAccount {
    #[serde(flatten)]
    profile: UpdateProfile,
    email: Option<String>,
    password: Option<String>,
}

pub(crate) async fn update_user<R, H, T>(
    user_id: UserID,
    auth_service: Data<AuthService<R, H, T>>,
    username: Path<String>,
    Json(UpdateAccount {
        profile,
        email,
        password,
    }): Json<UpdateAccount>,
) -> Result<HttpResponse>
where
    R: Repository,
    H: Hasher + Clone,
    T: TokenManager + Clone,
{
    user_id.ensure(&username)?;
    let email = match email {
        Some(email) if !email.contains('@') => {
            return Err(Error::bad_request(format!("invalid email: {}", email)));
        }
        email => email.map(|e| e.trim().to_owned()),
    };
    let password_hash = match password {
        Some(password) => Some(auth_service.hash_password(&password).await?),
        None => None,
    };
    let account = UpdateUser {
        email,
        password_hash,
        ..Default::default()
    };
    if profile.is_empty() && account.is_empty() {
        return Err(Error::bad_request("nothing to update"));
    }
    auth_service
        .repository
        .update_account(&username, &profile, &account)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub(crate) async fn followers<R: Repository>(
    repository: Data<R>,
    username: Path<String>,
) -> Result<HttpResponse> {
    let followers = repository.followers(&username).await?;
    Ok(HttpResponse::Ok().json(json!({ "followers": followers })))
}

pub(crate) async fn following<R: Repository>(
    repository: Data<R>,
    username: Path<String>,
) -> Result<HttpResponse> {
    let following = repository.following(&username).await?;
    Ok(HttpResponse::Ok().json(json!({ "following": following })))
}

pub(crate) async fn user_posts<R: Repository>(
    repository: Data<R>,
    username: Path<String>,
    Query(page): Query<Pagination>,
) -> Result<HttpResponse> {
    let posts = repository
        .user_posts(&username, page.limit(), page.offset())
        .await?;
    let posts = post_views(repository.get_ref(), posts).await?;
    Ok(HttpResponse::Ok().json(json!({ "posts": posts })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Follow {
    follower: String,
    followee: String,
}

pub(crate) async fn follow<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    Json(Follow { follower, followee }): Json<Follow>,
) -> Result<HttpResponse> {
    user_id.ensure(&follower)?;
    repository
        .follow(&follower, &followee)
        .await
        .map_err(public_failure("Follow failed"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub(crate) async fn unfollow<R: Repository>(
    user_id: UserID,
    repository: Data<R>,
    Json(Follow { follower, followee }): Json<Follow>,
) -> Result<HttpResponse> {
    user_id.ensure(&follower)?;
    repository
        .unfollow(&follower, &followee)
        .await
        .map_err(public_failure("Unfollow failed"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
