use crate::core::{error::Error as ApiError, token_manager::TokenManager};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{
    header::{HeaderName, HeaderValue},
    Method,
};
use actix_web::Error;
use core::task::Context;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Poll;

pub(crate) const AUTH_TOKEN_HEADER: &str = "x-auth-token";
pub(crate) const USER_ID_HEADER: &str = "x-user-id";

pub struct AuthTokenService<S, T>
where
    S: Service<ServiceRequest>,
{
    service: Rc<S>,
    token_manager: T,
}

impl<S, T> Service<ServiceRequest> for AuthTokenService<S, T>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    T: TokenManager + Clone + 'static,
{
    type Error = Error;
    type Response = ServiceResponse;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let token_manager = self.token_manager.clone();
        Box::pin(async move {
            // Rejections are responses, so outer middlewares still see them.
            if let Err(err) = authenticate(&mut req, &token_manager).await {
                return Ok(req.error_response(err));
            }
            service.call(req).await
        })
    }
}

async fn authenticate<T: TokenManager>(
    req: &mut ServiceRequest,
    token_manager: &T,
) -> Result<(), ApiError> {
    // Only the middleware may set the acting user.
    req.headers_mut()
        .remove(HeaderName::from_static(USER_ID_HEADER));
    let token = req
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty());
    match token {
        Some(token) => {
            let user_id = token_manager.verify_token(&token).await?;
            let value = HeaderValue::from_str(&user_id)
                .map_err(|e| ApiError::wrap("invalid user id in token".into(), 401, e))?;
            req.headers_mut()
                .insert(HeaderName::from_static(USER_ID_HEADER), value);
            Ok(())
        }
        None if !is_read_only(req.method()) => {
            Err(ApiError::unauthorized("missing auth token"))
        }
        None => Ok(()),
    }
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Verifies the `X-Auth-Token` header and forwards the token's subject as
/// `X-User-ID`. Requests that change state are rejected without a token.
#[derive(Clone)]
pub struct AuthTokenMiddleware<T> {
    token_manager: T,
}

impl<T> AuthTokenMiddleware<T> {
    pub fn new(token_manager: T) -> Self {
        Self { token_manager }
    }
}

impl<S, T> Transform<S, ServiceRequest> for AuthTokenMiddleware<T>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
    T: TokenManager + Clone + 'static,
{
    type Error = Error;
    type Response = ServiceResponse;
    type Transform = AuthTokenService<S, T>;
    type InitError = ();
    type Future = Pin<Box<dyn Future<Output = Result<Self::Transform, Self::InitError>>>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let token_manager = self.token_manager.clone();
        Box::pin(async move {
            Ok(AuthTokenService {
                service: Rc::new(service),
                token_manager,
            })
        })
    }
}
