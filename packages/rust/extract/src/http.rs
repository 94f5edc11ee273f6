//! HTTP fetch collaborator.
//!
//! [`PageFetcher`] is the seam the extractor depends on; [`HttpFetcher`] is
//! the reqwest-backed implementation with a request timeout, a configurable
//! certificate-verification switch, and SSRF protection.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};
use url::Url;

use newsdesk_shared::{ExtractConfig, FetchError, NewsdeskError, Result};

/// Maximum number of redirects to follow for a source page.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we read into memory (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// A successful HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub status: u16,
    /// Raw `Content-Type` header value, if sent.
    pub content_type: Option<String>,
    /// Decoded body; left empty for binary content types.
    pub body: String,
}

impl FetchedBody {
    /// Whether the declared content type is something we cannot read as text.
    pub fn is_binary(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_binary_content_type)
    }
}

/// Fetches a single URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, FetchError>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// reqwest-backed [`PageFetcher`].
pub struct HttpFetcher {
    client: Client,
    allow_private_hosts: bool,
}

impl HttpFetcher {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        if !config.verify_ssl {
            warn!("TLS certificate verification disabled for source fetches");
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, FetchError> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
            });
        }

        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5")
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if content_type.as_deref().is_some_and(is_binary_content_type) {
            debug!(content_type = ?content_type, "binary content, body not read");
            return Ok(FetchedBody {
                status: status.as_u16(),
                content_type,
                body: String::new(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: format!("response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"),
                });
            }
        }

        let body = response.text().await.map_err(|e| map_reqwest_error(url, e))?;

        Ok(FetchedBody {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn map_reqwest_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Content types that cannot be read as page text.
pub fn is_binary_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime == "application/pdf"
        || mime == "application/octet-stream"
        || mime == "application/zip"
        || mime.starts_with("image/")
        || mime.starts_with("audio/")
        || mime.starts_with("video/")
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(timeout: Duration) -> ExtractConfig {
        ExtractConfig {
            timeout,
            verify_ssl: true,
            user_agent: "newsdesk-test".into(),
            max_chars_per_source: 1000,
            allow_private_hosts: true,
        }
    }

    #[test]
    fn binary_content_types() {
        assert!(is_binary_content_type("application/pdf"));
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("Application/PDF; charset=binary"));
        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("application/xhtml+xml"));
    }

    #[test]
    fn ssrf_blocks_private_and_local_targets() {
        for raw in [
            "file:///etc/passwd",
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://localhost:3000/api",
            "http://[::1]/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn ssrf_allows_public() {
        let url = Url::parse("https://www.gse.it/dati").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn fetches_html_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><p>ciao</p></body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&config(Duration::from_secs(5))).unwrap();
        let url = Url::parse(&format!("{}/news", server.uri())).unwrap();
        let page = fetcher.get(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("ciao"));
        assert!(!page.is_binary());
    }

    #[tokio::test]
    async fn certificate_checks_can_be_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/insecure"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<p>self-signed</p>"),
            )
            .mount(&server)
            .await;

        let mut cfg = config(Duration::from_secs(5));
        cfg.verify_ssl = false;
        let fetcher = HttpFetcher::new(&cfg).unwrap();
        let url = Url::parse(&format!("{}/insecure", server.uri())).unwrap();
        let page = fetcher.get(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("self-signed"));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&config(Duration::from_secs(5))).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher.get(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&config(Duration::from_millis(200))).unwrap();
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let err = fetcher.get(&url).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[tokio::test]
    async fn binary_body_is_not_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(vec![0x25, 0x50, 0x44, 0x46]),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&config(Duration::from_secs(5))).unwrap();
        let url = Url::parse(&format!("{}/report", server.uri())).unwrap();
        let page = fetcher.get(&url).await.unwrap();

        assert!(page.is_binary());
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn private_hosts_blocked_by_default() {
        let mut cfg = config(Duration::from_secs(5));
        cfg.allow_private_hosts = false;
        let fetcher = HttpFetcher::new(&cfg).unwrap();

        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.get(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }
}
