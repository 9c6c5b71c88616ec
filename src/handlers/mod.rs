pub(crate) mod auth;
pub(crate) mod comments;
pub(crate) mod media;
pub(crate) mod posts;
pub(crate) mod users;

use crate::{
    core::{
        error::Error,
        hasher::Hasher,
        repository::{MediaRepository, PostRepository, UserRepository},
        storage::ObjectStorage,
        token_manager::TokenManager,
    },
    middlewares::auth::AuthTokenMiddleware,
};
use actix_web::{
    web::{delete, get, post, put, scope, ServiceConfig},
    HttpResponse,
};
use serde_json::json;

/// Everything the handlers need from the data layer.
pub(crate) trait Repository:
    UserRepository + PostRepository + MediaRepository + Clone + 'static
{
}

impl<T> Repository for T where
    T: UserRepository + PostRepository + MediaRepository + Clone + 'static
{
}

/// Replaces the message of client-side failures with a fixed public one.
/// Server failures keep their own message and status.
pub(crate) fn public_failure(message: &'static str) -> impl FnOnce(Error) -> Error {
    move |err| {
        if err.status_code >= 500 {
            err
        } else {
            Error::wrap(message.into(), 400, err.to_string())
        }
    }
}

pub(crate) async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Arthouse API running" }))
}

pub(crate) fn configure<R, H, T, S>(token_manager: T) -> impl FnOnce(&mut ServiceConfig)
where
    R: Repository,
    H: Hasher + Clone + 'static,
    T: TokenManager + Clone + 'static,
    S: ObjectStorage + Clone + 'static,
{
    move |cfg| {
        // Registered ahead of the guarded scope so they never need a token.
        cfg.route("/", get().to(index))
            .route("/api/register", post().to(auth::register::<R, H, T>))
            .route("/api/login", post().to(auth::login::<R, H, T>))
            .service(
                scope("/api")
                    .wrap(AuthTokenMiddleware::new(token_manager))
                    .route("/user/{username}", get().to(users::get_user::<R>))
                    .route("/user/{username}", put().to(users::update_user::<R, H, T>))
                    .route("/user/{username}/followers", get().to(users::followers::<R>))
                    .route("/user/{username}/following", get().to(users::following::<R>))
                    .route("/user/{username}/posts", get().to(users::user_posts::<R>))
                    .route("/follow", post().to(users::follow::<R>))
                    .route("/unfollow", post().to(users::unfollow::<R>))
                    .route("/posts", post().to(posts::create_post::<R>))
                    .route("/posts", get().to(posts::list_posts::<R>))
                    .route("/posts/{post_id}", get().to(posts::get_post::<R>))
                    .route("/posts/{post_id}", put().to(posts::update_post::<R>))
                    .route("/posts/{post_id}", delete().to(posts::delete_post::<R, S>))
                    .route("/posts/{post_id}/like", post().to(posts::like_post::<R>))
                    .route("/posts/{post_id}/like", delete().to(posts::unlike_post::<R>))
                    .route(
                        "/posts/{post_id}/comments",
                        get().to(comments::post_comments::<R>),
                    )
                    .route(
                        "/posts/{post_id}/comments",
                        post().to(comments::create_comment::<R>),
                    )
                    .route(
                        "/comments/{comment_id}",
                        put().to(comments::update_comment::<R>),
                    )
                    .route(
                        "/comments/{comment_id}",
                        delete().to(comments::delete_comment::<R>),
                    )
                    .route("/hashtags/search", get().to(posts::search_hashtags::<R>))
                    .route("/media-urls/{post_id}", get().to(media::media_urls::<R, S>))
                    .route("/media/upload-url", post().to(media::upload_url::<S>))
                    .route("/media/upload", post().to(media::upload::<R, S>)),
            );
    }
}
