use crate::core::error::Result;

pub trait Hasher: Send + 'static {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}
