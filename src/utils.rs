use crate::core::error::{Error, Result};
use actix_web::{error::ErrorUnauthorized, FromRequest};
use serde::Deserialize;
use std::future::{ready, Ready};

pub(crate) const DEFAULT_LIMIT: i64 = 5;
pub(crate) const MAX_LIMIT: i64 = 50;

/// The user the auth middleware resolved from the request's token.
#[derive(Debug)]
pub(crate) struct UserID(pub(crate) String);

impl UserID {
    /// Fails with 403 unless the acting user is `username`.
    pub(crate) fn ensure(&self, username: &str) -> Result<()> {
        if self.0 != username {
            return Err(Error::forbidden(format!(
                "{} cannot act on behalf of {}",
                self.0, username
            )));
        }
        Ok(())
    }
}

impl FromRequest for UserID {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    #[inline]
    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        ready(
            req.headers()
                .get(crate::middlewares::auth::USER_ID_HEADER)
                .ok_or(ErrorUnauthorized("no user id header"))
                .and_then(|s| {
                    s.to_str()
                        .map_err(ErrorUnauthorized)
                        .map(|s| UserID(s.to_owned()))
                }),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl Pagination {
    pub(crate) fn limit_or(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }

    pub(crate) fn limit(&self) -> i64 {
        self.limit_or(DEFAULT_LIMIT)
    }

    pub(crate) fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
