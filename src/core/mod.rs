pub mod auth;
pub mod entities;
pub mod error;
pub mod hasher;
pub mod media;
pub mod repository;
pub mod storage;
pub mod token_manager;
