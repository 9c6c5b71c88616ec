pub(crate) mod media;
pub(crate) mod posts;
pub(crate) mod users;

use sqlx::PgPool;

#[derive(Debug, Clone)]
pub(crate) struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
