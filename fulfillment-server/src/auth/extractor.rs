//! Principal Extractor
//!
//! Hands the principal attached by [`require_auth`](super::require_auth) to
//! handlers. Extraction never fails; services turn a missing principal into
//! `Unauthenticated` through the permission evaluator.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::CurrentUser;

/// The acting principal of a request, if any
#[derive(Debug, Clone)]
pub struct Principal(pub Option<CurrentUser>);

impl Principal {
    pub fn user(&self) -> Option<&CurrentUser> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}
