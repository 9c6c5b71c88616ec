use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{
    header::{self, HeaderValue},
    Method,
};
use actix_web::{Error, HttpResponse};
use core::task::Context;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, X-Auth-Token";

pub struct CORSService<S>
where
    S: Service<ServiceRequest>,
{
    service: S,
}

impl<S> Service<ServiceRequest> for CORSService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
{
    type Error = Error;
    type Response = ServiceResponse;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Preflight requests are answered here and never reach the routes.
        if req.method() == Method::OPTIONS {
            let mut res = req.into_response(HttpResponse::NoContent().finish());
            allow(&mut res);
            return Box::pin(async move { Ok(res) });
        }
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            allow(&mut res);
            Ok(res)
        })
    }
}

fn allow(res: &mut ServiceResponse) {
    let headers = res.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

#[derive(Default)]
pub struct CORSMiddleware;

impl<S> Transform<S, ServiceRequest> for CORSMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = Error> + 'static,
{
    type Error = Error;
    type Response = ServiceResponse;
    type Transform = CORSService<S>;
    type InitError = ();
    type Future = Pin<Box<dyn Future<Output = Result<Self::Transform, Self::InitError>>>>;

    fn new_transform(&self, service: S) -> Self::Future {
        Box::pin(async move { Ok(CORSService { service }) })
    }
}
