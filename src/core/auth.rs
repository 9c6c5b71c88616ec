use crate::core::{
    entities::{CreateUser, Profile, User},
    error::{Error, Result},
    hasher::Hasher,
    repository::UserRepository,
    token_manager::TokenManager,
};
use actix_web::web;

#[derive(Debug, Clone)]
pub struct AuthService<R, H, T>
where
    R: UserRepository + Clone,
    H: Hasher + Clone,
    T: TokenManager + Clone,
{
    pub repository: R,
    pub hasher: H,
    pub token_manager: T,
}

impl<R, H, T> AuthService<R, H, T>
where
    R: UserRepository + Clone,
    H: Hasher + Clone,
    T: TokenManager + Clone,
{
    pub fn new(repository: R, hasher: H, token_manager: T) -> Self {
        Self {
            repository,
            hasher,
            token_manager,
        }
    }

    /// Creates the user and its profile. The user row is removed again if
    /// the profile cannot be created.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(User, Profile)> {
        validate_username(username)?;
        if email.trim().is_empty() || !email.contains('@') {
            return Err(Error::bad_request(format!("invalid email: {}", email)));
        }
        let user = CreateUser {
            username: username.to_owned(),
            email: email.trim().to_owned(),
            password_hash: self.hash_password(password).await?,
        };
        self.repository.create_user(&user).await?;

        let profile = Profile {
            username: username.to_owned(),
            name: if name.trim().is_empty() {
                username.to_owned()
            } else {
                name.trim().to_owned()
            },
            profile_picture_url: String::new(),
            bio: String::new(),
        };
        if let Err(err) = self.repository.create_profile(&profile).await {
            if let Err(cleanup) = self.repository.delete_user(username).await {
                log::error!(
                    "failed to remove user {} after profile failure: {}",
                    username,
                    cleanup
                );
            }
            return Err(err);
        }
        Ok((
            User {
                username: user.username,
                email: user.email,
            },
            profile,
        ))
    }

    pub async fn verify_login(&self, username: &str, password: &str) -> Result<bool> {
        let Some(hash) = self.repository.get_password_hash(username).await? else {
            return Ok(false);
        };
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        web::block(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| Error::wrap("password worker failed".into(), 500, e.to_string()))?
    }

    /// Returns the user, its profile and a fresh auth token.
    pub async fn login_by_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, Profile, String)> {
        if !self.verify_login(username, password).await? {
            return Err(Error::unauthorized("invalid username or password"));
        }
        let user = self
            .repository
            .get_user(username)
            .await?
            .ok_or(Error::unauthorized("invalid username or password"))?;
        let profile = self
            .repository
            .get_profile(username)
            .await?
            .ok_or(Error::not_found(format!("profile not found: {}", username)))?;
        let token = self.token_manager.generate_token(username).await?;
        Ok((user, profile, token))
    }

    pub async fn verify_token(&self, token: &str) -> Result<String> {
        self.token_manager.verify_token(token).await
    }

    /// Hashes on the blocking thread pool.
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(Error::bad_request("password must not be empty"));
        }
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        web::block(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::wrap("password worker failed".into(), 500, e.to_string()))?
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty()
        || username.len() > 64
        || username.chars().any(|c| c.is_whitespace() || c == '/')
    {
        return Err(Error::bad_request(format!("invalid username: {:?}", username)));
    }
    Ok(())
}
