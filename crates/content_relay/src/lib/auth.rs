//! Bearer token verification for the document endpoints.

use std::future::Future;

use axum::http::{header::AUTHORIZATION, request::Parts, StatusCode};
use reqwest::Client;
use serde::Deserialize;

use crate::{fetch::transport_error, Error};

pub trait TokenVerifier: Send + Sync + 'static {
    /// Resolves a bearer token to the id of the user it was issued to.
    fn verify(&self, token: &str) -> impl Future<Output = Result<String, Error>> + Send;
}

/// The authenticated user of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Result<&str, Error> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("malformed Authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("expected a bearer token".into()))?;

    Ok(token)
}

/// Verifies tokens by presenting them to an identity provider endpoint that
/// answers with the token's claims.
#[derive(Debug, Clone)]
pub struct HttpTokenVerifier {
    client: Client,
    verify_url: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(alias = "user_id", alias = "sub")]
    uid: String,
}

impl HttpTokenVerifier {
    pub fn new(client: Client, verify_url: impl Into<String>) -> Self {
        Self {
            client,
            verify_url: verify_url.into(),
        }
    }
}

impl TokenVerifier for HttpTokenVerifier {
    #[tracing::instrument(skip_all)]
    async fn verify(&self, token: &str) -> Result<String, Error> {
        let timeout = crate::fetch::DEFAULT_FETCH_TIMEOUT;
        let resp = self
            .client
            .post(&self.verify_url)
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))
            .inspect_err(|e| tracing::error!(error = %e, "Failed to reach token verifier"))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::Unauthorized("invalid or expired token".into()));
            }
            s => {
                return Err(Error::Upstream {
                    status: Some(s.as_u16()),
                    message: format!("token verifier responded with {s}"),
                })
            }
        }

        let claims = resp
            .json::<Claims>()
            .await
            .map_err(|e| Error::Unauthorized(format!("unreadable token claims: {e}")))?;

        Ok(claims.uid)
    }
}
