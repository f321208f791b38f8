use std::time::Duration;

use error_stack::{Report, Result, ResultExt};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Url;
use tracing::{event, instrument, Level};

use crate::domain::BalanceError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_POLISH_FIRST: &str = "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7";
const EXCERPT_CHARS: usize = 160;

/// A page as the portal served it, after redirects.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

/// Cookie-backed HTTP session against the portal.
///
/// Default headers only fill in what a request does not set itself, so
/// per-request headers always win. Every request is bounded by the session
/// timeout.
#[derive(Debug)]
pub struct PortalSession {
    client: Client,
    timeout: Duration,
}

impl PortalSession {
    pub fn new(timeout: Duration) -> Result<Self, BalanceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_POLISH_FIRST));

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(network_error)
            .attach_printable("Failed to create HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get(&self, url: &Url, referer: Option<&Url>) -> Result<PortalResponse, BalanceError> {
        self.get_with_headers(url, referer, HeaderMap::new())
    }

    /// GET with request-specific headers, which replace the session defaults
    /// of the same name.
    #[instrument(skip(self, headers))]
    pub fn get_with_headers(
        &self,
        url: &Url,
        referer: Option<&Url>,
        headers: HeaderMap,
    ) -> Result<PortalResponse, BalanceError> {
        let request = with_referer(self.client.get(url.clone()).headers(headers), referer);
        self.send(request, url)
    }

    /// Posts an url-encoded form. Field values are not logged.
    #[instrument(skip(self, form))]
    pub fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        referer: Option<&Url>,
    ) -> Result<PortalResponse, BalanceError> {
        let request = with_referer(self.client.post(url.clone()).form(form), referer);
        self.send(request, url)
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> Result<PortalResponse, BalanceError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .map_err(network_error)
            .attach_printable_lazy(|| format!("URL: {}", url))?;

        let status = response.status();
        let final_url = response.url().clone();
        event!(Level::DEBUG, status = status.as_u16(), final_url = %final_url, "Portal responded");

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Report::new(BalanceError::HttpStatusError {
                status: status.as_u16(),
                excerpt: excerpt(&body),
            })
            .attach_printable(format!("URL: {}", url)));
        }

        let body = response
            .text()
            .map_err(network_error)
            .attach_printable("Failed to read response body")
            .attach_printable_lazy(|| format!("URL: {}", url))?;

        Ok(PortalResponse {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn with_referer(request: RequestBuilder, referer: Option<&Url>) -> RequestBuilder {
    match referer {
        Some(referer) => request.header(REFERER, referer.as_str()),
        None => request,
    }
}

fn network_error(error: reqwest::Error) -> Report<BalanceError> {
    let reason = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else {
        error.to_string()
    };
    Report::new(error).change_context(BalanceError::NetworkError(reason))
}

fn excerpt(body: &str) -> String {
    body.chars()
        .take(EXCERPT_CHARS)
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&server.url(path)).unwrap()
    }

    #[test]
    fn test_get_applies_default_headers() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET)
                .path("/page")
                .header("accept-language", ACCEPT_POLISH_FIRST)
                .header("user-agent", USER_AGENT);
            then.status(200).body("<html>ok</html>");
        });

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        let response = session.get(&url(&server, "/page"), None).unwrap();

        page.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>ok</html>");
    }

    #[test]
    fn test_get_sends_referer() {
        let server = MockServer::start();
        let referer = url(&server, "/index.xhtml");
        let page = server.mock(|when, then| {
            when.method(GET).path("/page").header("referer", referer.as_str());
            then.status(200).body("ok");
        });

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        session.get(&url(&server, "/page"), Some(&referer)).unwrap();

        page.assert();
    }

    #[test]
    fn test_request_headers_override_defaults() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET)
                .path("/partial")
                .header("accept", "application/xml")
                .header("accept-language", ACCEPT_POLISH_FIRST);
            then.status(200).body("<partial-response/>");
        });
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/xml"));

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        session
            .get_with_headers(&url(&server, "/partial"), None, headers)
            .unwrap();

        page.assert();
    }

    #[test]
    fn test_cookies_are_kept_between_requests() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/login");
            then.status(200)
                .header("set-cookie", "JSESSIONID=abc123; Path=/")
                .body("login");
        });
        let with_cookie = server.mock(|when, then| {
            when.method(GET).path("/account").header("cookie", "JSESSIONID=abc123");
            then.status(200).body("account");
        });

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        session.get(&url(&server, "/login"), None).unwrap();
        let response = session.get(&url(&server, "/account"), None).unwrap();

        with_cookie.assert();
        assert_eq!(response.body, "account");
    }

    #[test]
    fn test_non_success_status_carries_excerpt() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(503).body(format!("  Service Unavailable {}", "x".repeat(300)));
        });

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        let error = session.get(&url(&server, "/broken"), None).unwrap_err();

        match error.current_context() {
            BalanceError::HttpStatusError { status, excerpt } => {
                assert_eq!(*status, 503);
                assert!(excerpt.starts_with("Service Unavailable"));
                assert!(excerpt.chars().count() <= EXCERPT_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connection_failure_is_network_error() {
        let session = PortalSession::new(Duration::from_secs(2)).unwrap();
        let unreachable = Url::parse("http://127.0.0.1:9/ebok/").unwrap();

        let error = session.get(&unreachable, None).unwrap_err();

        assert!(matches!(
            error.current_context(),
            BalanceError::NetworkError(_)
        ));
    }

    #[test]
    fn test_timeout_is_network_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(1500)).body("late");
        });

        let session = PortalSession::new(Duration::from_millis(200)).unwrap();
        let error = session.get(&url(&server, "/slow"), None).unwrap_err();

        match error.current_context() {
            BalanceError::NetworkError(reason) => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_post_form_encodes_fields() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("hiddenLoginForm%3AhiddenLogin=jan")
                .body_contains("javax.faces.ViewState=vs-1");
            then.status(200).body("done");
        });

        let session = PortalSession::new(DEFAULT_TIMEOUT).unwrap();
        session
            .post_form(
                &url(&server, "/login"),
                &[
                    ("hiddenLoginForm:hiddenLogin", "jan"),
                    ("javax.faces.ViewState", "vs-1"),
                ],
                None,
            )
            .unwrap();

        login.assert();
    }
}
