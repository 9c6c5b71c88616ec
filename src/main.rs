pub mod core;
pub mod handlers;
pub mod hashers;
pub mod metadata;
pub mod middlewares;
pub mod storages;
pub mod stores;
pub mod token_managers;
pub mod utils;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use crate::core::auth::AuthService;
use hashers::argon::Argon2Hasher;
use hmac::{Hmac, Mac};
use middlewares::cors::CORSMiddleware;
use nb_from_env::{FromEnv, FromEnvDerive};
use sqlx::postgres::PgPoolOptions;
use storages::gcs::{GcsSigner, GcsStorage};
use stores::postgres::PostgresRepository;
use token_managers::jwt::JWTTokenManager;

#[derive(FromEnvDerive)]
struct Config {
    listen_address: String,
    database_url: String,
    auth_token_secret: String,
    gcs_bucket: String,
    gcs_service_account_file: String,
}

type TokenManager = JWTTokenManager<Hmac<sha2::Sha256>>;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to postgresql");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to run database migrations");
    let repository = PostgresRepository::new(pool);

    let signer = GcsSigner::from_service_account_file(&config.gcs_service_account_file)
        .expect("failed to load gcs service account");
    let storage = GcsStorage::new(config.gcs_bucket, signer);

    let token_manager: TokenManager = JWTTokenManager::new(
        Hmac::new_from_slice(config.auth_token_secret.as_bytes())
            .expect("invalid auth token secret"),
    );
    let auth_service = AuthService::new(
        repository.clone(),
        Argon2Hasher,
        token_manager.clone(),
    );

    log::info!("listening on {}", config.listen_address);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(repository.clone()))
            .app_data(Data::new(storage.clone()))
            .app_data(Data::new(auth_service.clone()))
            .wrap(CORSMiddleware)
            .wrap(Logger::default())
            .configure(handlers::configure::<
                PostgresRepository,
                Argon2Hasher,
                TokenManager,
                GcsStorage,
            >(token_manager.clone()))
    })
    .bind(config.listen_address)
    .expect("failed to bind to listen address")
    .run()
    .await
}
