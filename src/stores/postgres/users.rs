use super::PostgresRepository;
use crate::core::{
    entities::{CreateUser, Profile, UpdateProfile, UpdateUser, User},
    error::{Error, Result},
    repository::UserRepository,
};
use sqlx::{query, query_as, query_scalar, Postgres, QueryBuilder};

impl UserRepository for PostgresRepository {
    async fn create_user(&self, user: &CreateUser) -> Result<()> {
        query("INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)")
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to create user {}", user.username), e)
            })?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        query_as::<_, User>("SELECT username, email FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to get user {}", username), e))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        query_as::<_, User>("SELECT username, email FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::database("failed to list users".into(), e))
    }

    async fn get_password_hash(&self, username: &str) -> Result<Option<String>> {
        query_scalar::<_, String>("SELECT password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to get password of {}", username), e)
            })
    }

    async fn update_user(&self, username: &str, update: &UpdateUser) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let result = user_update(username, update)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to update user {}", username), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        let result = query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(format!("failed to delete user {}", username), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("user not found: {}", username)));
        }
        Ok(())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        query(
            "INSERT INTO profile (username, name, profile_picture_url, bio)
            VALUES ($1, $2, $3, $4)",
        )
        .bind(&profile.username)
        .bind(&profile.name)
        .bind(&profile.profile_picture_url)
        .bind(&profile.bio)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::database(format!("failed to create profile {}", profile.username), e)
        })?;
        Ok(())
    }

    async fn get_profile(&self, username: &str) -> Result<Option<Profile>> {
        query_as::<_, Profile>(
            "SELECT username, name, profile_picture_url, bio FROM profile WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get profile {}", username), e))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        query_as::<_, Profile>(
            "SELECT username, name, profile_picture_url, bio FROM profile ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database("failed to list profiles".into(), e))
    }

    async fn update_profile(&self, username: &str, update: &UpdateProfile) -> Result<()> {
        if update.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let result = profile_update(username, update)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to update profile {}", username), e)
            })?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!("profile not found: {}", username)));
        }
        Ok(())
    }

    async fn update_account(
        &self,
        username: &str,
        profile: &UpdateProfile,
        user: &UpdateUser,
    ) -> Result<()> {
        if profile.is_empty() && user.is_empty() {
            return Err(Error::bad_request("nothing to update"));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::database("failed to begin transaction".into(), e))?;
        if !profile.is_empty() {
            let result = profile_update(username, profile)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::database(format!("failed to update profile {}", username), e)
                })?;
            if result.rows_affected() == 0 {
                return Err(Error::not_found(format!("profile not found: {}", username)));
            }
        }
        if !user.is_empty() {
            let result = user_update(username, user)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::database(format!("failed to update user {}", username), e)
                })?;
            if result.rows_affected() == 0 {
                return Err(Error::not_found(format!("user not found: {}", username)));
            }
        }
        tx.commit()
            .await
            .map_err(|e| Error::database("failed to commit account update".into(), e))
    }

    async fn follow(&self, follower: &str, followee: &str) -> Result<()> {
        if follower == followee {
            return Err(Error::bad_request("users cannot follow themselves"));
        }
        query("INSERT INTO follower_relationships (follower, followee) VALUES ($1, $2)")
            .bind(follower)
            .bind(followee)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::database(format!("failed to follow {} as {}", followee, follower), e)
            })?;
        Ok(())
    }

    async fn unfollow(&self, follower: &str, followee: &str) -> Result<()> {
        let result = query(
            "DELETE FROM follower_relationships WHERE follower = $1 AND followee = $2",
        )
        .bind(follower)
        .bind(followee)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::database(format!("failed to unfollow {} as {}", followee, follower), e)
        })?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found(format!(
                "{} does not follow {}",
                follower, followee
            )));
        }
        Ok(())
    }

    async fn followers(&self, username: &str) -> Result<Vec<String>> {
        query_scalar::<_, String>(
            "SELECT follower FROM follower_relationships WHERE followee = $1 ORDER BY follower",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get followers of {}", username), e))
    }

    async fn following(&self, username: &str) -> Result<Vec<String>> {
        query_scalar::<_, String>(
            "SELECT followee FROM follower_relationships WHERE follower = $1 ORDER BY followee",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(format!("failed to get followees of {}", username), e))
    }
}

fn user_update<'a>(username: &'a str, update: &'a UpdateUser) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut fields = builder.separated(", ");
    if let Some(new_username) = &update.new_username {
        fields.push("username = ").push_bind_unseparated(new_username);
    }
    if let Some(email) = &update.email {
        fields.push("email = ").push_bind_unseparated(email);
    }
    if let Some(hash) = &update.password_hash {
        fields.push("password_hash = ").push_bind_unseparated(hash);
    }
    builder.push(" WHERE username = ").push_bind(username);
    builder
}

fn profile_update<'a>(
    username: &'a str,
    update: &'a UpdateProfile,
) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE profile SET ");
    let mut fields = builder.separated(", ");
    if let Some(name) = &update.name {
        fields.push("name = ").push_bind_unseparated(name);
    }
    if let Some(url) = &update.profile_picture_url {
        fields.push("profile_picture_url = ").push_bind_unseparated(url);
    }
    if let Some(bio) = &update.bio {
        fields.push("bio = ").push_bind_unseparated(bio);
    }
    builder.push(" WHERE username = ").push_bind(username);
    builder
}
