use crate::core::error::Result;

pub trait TokenManager {
    async fn generate_token(&self, id: &str) -> Result<String>;
    /// Returns the id the token was issued for.
    async fn verify_token(&self, token: &str) -> Result<String>;
}
