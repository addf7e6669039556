//! # Request Gate
//!
//! Validation shared by every endpoint. Everything here runs before any
//! external call is made, and every rejection is a [`ValidationError`] (400),
//! or [`Error::Forbidden`] for ownership checks.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use reqwest::Url;

use crate::{
    auth::Caller, config::RelaySettings, error::ValidationError, llm::SamplingParams, Error,
};

/// [`Json`] whose rejections are reported as [`ValidationError::MalformedBody`].
pub struct GateJson<T>(pub T);

impl<S, T> FromRequest<S> for GateJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;
        Ok(GateJson(value))
    }
}

/// [`Query`] whose rejections are reported as [`ValidationError::MalformedBody`].
pub struct GateQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for GateQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;
        Ok(GateQuery(value))
    }
}

/// Present, and not blank once trimmed.
pub fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

/// An absolute `http` or `https` URL with a host.
pub fn http_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".into()));
    }

    Ok(url)
}

/// Caller overrides applied on top of the configured sampling defaults.
pub fn sampling(
    settings: &RelaySettings,
    temperature: Option<f64>,
    max_tokens: Option<i64>,
) -> Result<SamplingParams, ValidationError> {
    let mut params = settings.sampling;

    if let Some(temperature) = temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ValidationError::OutOfRange {
                field: "temperature",
                min: 0.0,
                max: 2.0,
            });
        }
        params.temperature = temperature as f32;
    }

    if let Some(max_tokens) = max_tokens {
        let limit = settings.max_tokens_limit;
        params.max_tokens = u32::try_from(max_tokens)
            .ok()
            .filter(|m| (1..=limit).contains(m))
            .ok_or(ValidationError::OutOfRange {
                field: "max_tokens",
                min: 1.0,
                max: f64::from(limit),
            })?;
    }

    Ok(params)
}

pub fn limit(value: Option<usize>, default: usize, max: usize) -> Result<usize, ValidationError> {
    match value {
        None => Ok(default),
        Some(v) if (1..=max).contains(&v) => Ok(v),
        Some(_) => Err(ValidationError::OutOfRange {
            field: "limit",
            min: 1.0,
            max: max as f64,
        }),
    }
}

/// Only the owner may see or touch a record.
pub fn ensure_owner(owner: &str, caller: &Caller, resource: &str) -> Result<(), Error> {
    if owner == caller.user_id {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.user_id, resource, "Ownership check failed");
        Err(Error::Forbidden(format!("{resource} belongs to another user")))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde_json::Value;

    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required("prompt", Some("  hi ")).unwrap(), "hi");
        assert!(matches!(
            required("prompt", Some("   ")),
            Err(ValidationError::MissingField("prompt"))
        ));
        assert!(required("prompt", None).is_err());
    }

    #[test]
    fn test_http_url() {
        assert_eq!(
            http_url("https://example.com/a?b=c").unwrap().host_str(),
            Some("example.com")
        );
        for bad in ["example.com", "ftp://example.com/file", "javascript:alert(1)", "http://"] {
            assert!(
                matches!(http_url(bad), Err(ValidationError::InvalidUrl { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_sampling_bounds() {
        let settings = RelaySettings::default();

        let params = sampling(&settings, Some(0.0), Some(1)).unwrap();
        assert_eq!(params.temperature, 0.0);
        assert_eq!(params.max_tokens, 1);
        assert_eq!(params.top_p, settings.sampling.top_p);

        assert_eq!(sampling(&settings, None, None).unwrap(), settings.sampling);
        assert!(sampling(&settings, Some(2.01), None).is_err());
        assert!(sampling(&settings, Some(-0.1), None).is_err());
        assert!(sampling(&settings, None, Some(0)).is_err());
        assert!(sampling(&settings, None, Some(-5)).is_err());
        assert!(sampling(&settings, None, Some(i64::from(settings.max_tokens_limit) + 1)).is_err());
    }

    #[test]
    fn test_limit() {
        assert_eq!(limit(None, 50, 200).unwrap(), 50);
        assert_eq!(limit(Some(200), 50, 200).unwrap(), 200);
        assert!(limit(Some(0), 50, 200).is_err());
        assert!(limit(Some(201), 50, 200).is_err());
    }

    #[test]
    fn test_ensure_owner() {
        let caller = Caller {
            user_id: "alice".into(),
        };
        assert!(ensure_owner("alice", &caller, "note n1").is_ok());
        assert!(matches!(
            ensure_owner("bob", &caller, "note n1"),
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"prompt\": "))
            .unwrap();

        let err = GateJson::<Value>::from_request(req, &()).await.err().unwrap();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MalformedBody(_))
        ));
        assert_eq!(err.status().as_u16(), 400);
    }
}
