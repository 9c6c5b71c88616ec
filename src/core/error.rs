use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::fmt::{Debug, Display};

#[derive(Debug)]
pub struct Error {
    pub message: String,
    pub status_code: u16,
    pub cause: Option<Box<dyn Debug + Send + Sync>>,
}

impl Error {
    pub fn new(message: String, status_code: u16) -> Self {
        Error {
            message,
            status_code,
            cause: None,
        }
    }

    pub fn wrap<T>(message: String, status_code: u16, cause: T) -> Self
    where
        T: Debug + Send + Sync + 'static,
    {
        Error {
            message,
            status_code,
            cause: Some(Box::new(cause)),
        }
    }

    /// Wraps a database error, mapping constraint violations to client
    /// errors and everything else to 500.
    pub fn database(message: String, err: sqlx::Error) -> Self {
        let status_code = match &err {
            sqlx::Error::RowNotFound => 404,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => 409,
                Some("23503") => 404,
                Some("23514") | Some("22001") => 400,
                _ => 500,
            },
            _ => 500,
        };
        Error::wrap(message, status_code, err)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::new(message.into(), 400)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::new(message.into(), 401)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::new(message.into(), 403)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::new(message.into(), 404)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::new(message.into(), 409)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(message.into(), 500)
    }

    /// Replaces the public message, keeping the status code and the
    /// original error as the cause.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let status_code = self.status_code;
        Error::wrap(message.into(), status_code, self.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(cause) = &self.cause {
            write!(f, "{}: {:?}", self.message, cause)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code >= 500 {
            log::error!("{}", self);
        } else {
            log::warn!("{}", self);
        }
        HttpResponse::build(self.status_code())
            .json(json!({ "error": self.message }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
