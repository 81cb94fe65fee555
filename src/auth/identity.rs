use std::future::{ready, Ready};

use actix_web::{FromRequest, HttpMessage, HttpRequest};
use async_graphql::Context;

use crate::errors::{AppError, AppResult};

/// The user the hosting platform vouched for on this request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl FromRequest for CallerIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let identity = req
            .extensions()
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()));

        ready(identity)
    }
}

pub fn caller_from_context(ctx: &Context<'_>) -> AppResult<CallerIdentity> {
    ctx.data::<CallerIdentity>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}
