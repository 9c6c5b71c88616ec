use super::{public_failure, Repository};
use crate::core::{
    auth::AuthService,
    error::{Error, Result},
    hasher::Hasher,
    token_manager::TokenManager,
};
use actix_web::{
    web::{Data, Json},
    HttpResponse,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct Register {
    username: String,
    email: String,
    password: String,
    name: Option<String>,
}

pub(crate) async fn register<R, H, T>(
    auth_service: Data<AuthService<R, H, T>>,
    Json(Register {
        username,
        email,
        password,
        name,
    }): Json<Register>,
) -> Result<HttpResponse>
where
    R: Repository,
    H: Hasher + Clone,
    T: TokenManager + Clone,
{
    let (user, profile) = auth_service
        .signup(&username, &email, &password, name.as_deref().unwrap_or(""))
        .await
        .map_err(public_failure("User creation failed"))?;
    log::info!("registered user {}", user.username);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": {
            "username": user.username,
            "email": user.email,
            "name": profile.name,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Login {
    username: String,
    password: String,
}

pub(crate) async fn login<R, H, T>(
    auth_service: Data<AuthService<R, H, T>>,
    Json(Login { username, password }): Json<Login>,
) -> Result<HttpResponse>
where
    R: Repository,
    H: Hasher + Clone,
    T: TokenManager + Clone,
{
    let (user, profile, token) = auth_service
        .login_by_password(&username, &password)
        .await
        .map_err(|e| {
            if e.status_code >= 500 {
                e
            } else {
                Error::wrap("Invalid login".into(), 401, e.to_string())
            }
        })?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": {
            "username": user.username,
            "email": user.email,
            "name": profile.name,
        },
        "token": token,
    })))
}
