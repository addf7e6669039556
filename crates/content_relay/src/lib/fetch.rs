use std::{future::Future, time::Duration};

use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, Response, Url};

use crate::{error::ValidationError, Error};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub trait PageFetcher: Send + Sync + 'static {
    /// Fetches the HTML document at `url`.
    fn fetch_page(&self, url: &Url) -> impl Future<Output = Result<String, Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl PageFetcher for HttpPageFetcher {
    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn fetch_page(&self, url: &Url) -> Result<String, Error> {
        let resp = send_checked(self.client.get(url.clone()), self.timeout).await?;

        if let Some(content_type) = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html(content_type) {
                tracing::warn!(content_type, "Refusing non-HTML page");
                return Err(ValidationError::UnsupportedContentType(content_type.to_string()).into());
            }
        }

        resp.text()
            .await
            .map_err(|e| transport_error(e, self.timeout))
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Sends `request` with a bounded timeout, rejecting non-2xx responses.
pub(crate) async fn send_checked(request: RequestBuilder, timeout: Duration) -> Result<Response, Error> {
    let resp = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))
        .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

    let status = resp.status();
    if !status.is_success() {
        tracing::warn!(%status, url = %resp.url(), "Upstream responded with failure");
        return Err(Error::Upstream {
            status: Some(status.as_u16()),
            message: format!("{} responded with {status}", resp.url()),
        });
    }

    Ok(resp)
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout)
    } else {
        Error::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_content_types() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=UTF-8"));
        assert!(is_html("Application/XHTML+XML"));
        assert!(!is_html("application/pdf"));
        assert!(!is_html("application/json"));
    }
}
