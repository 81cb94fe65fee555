use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderName,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;

use crate::{
    auth::CallerIdentity,
    errors::{AppError, AppResult},
};

/// Turns the identity header stamped by the hosting platform into a
/// `CallerIdentity` request extension. Requests without the header pass
/// through anonymous; resolvers that need a caller reject them.
#[derive(Clone)]
pub struct IdentityMiddleware {
    header: HeaderName,
}

impl IdentityMiddleware {
    pub fn new(header: &str) -> AppResult<Self> {
        let header = HeaderName::from_bytes(header.to_ascii_lowercase().as_bytes()).map_err(|_| {
            AppError::ValidationError(format!("Invalid identity header name '{}'", header))
        })?;
        Ok(Self { header })
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            header: self.header.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    header: HeaderName,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_id = req
            .headers()
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        if let Some(user_id) = user_id {
            req.extensions_mut().insert(CallerIdentity::new(user_id));
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}
