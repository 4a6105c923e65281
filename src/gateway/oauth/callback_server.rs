//! Usage: Capture OAuth authorization redirects, in arrival order, for later attribution.
//!
//! Two capture paths share [`RedirectCapture`]:
//! - webview shells call [`RedirectCapture::on_before_request`] from their navigation hook;
//! - a loopback listener ([`bind_redirect_listener`] + [`capture_redirects`]) serves the
//!   redirect URI itself when the login runs in an external browser.
//!
//! Auth cookies are cleared after every captured redirect and before the browser is answered.
//! Without that, the next login silently reuses the previous tenant's session.

use crate::shared::error::AppResult;
use reqwest::Url;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SUCCESS_HTML: &str =
    "<html><body><h1>Login received</h1><p>You may return to the migration console.</p></body></html>";
const ERROR_HTML: &str = "<html><body><h1>Login failed</h1><p>You may close this window and retry.</p></body></html>";
const NOT_FOUND_HTML: &str = "<html><body><h1>Not found</h1></body></html>";

/// Browser cookie storage for the authentication domain.
pub trait AuthCookieStore: Send {
    fn clear_auth_cookies(&mut self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// Not an OAuth redirect; let the navigation proceed.
    Continue,
    /// Redirect captured; the shell cancels the navigation and reloads the console.
    Cancel,
}

pub struct RedirectCapture<C> {
    base: Url,
    redirects: Vec<String>,
    cookies: C,
}

impl<C: AuthCookieStore> RedirectCapture<C> {
    pub fn new(redirect_uri: &str, cookies: C) -> AppResult<Self> {
        let base = Url::parse(redirect_uri.trim())
            .map_err(|e| format!("SEC_INVALID_INPUT: invalid redirect uri: {e}"))?;
        if base.host_str().is_none() {
            return Err("SEC_INVALID_INPUT: redirect uri must have a host"
                .to_string()
                .into());
        }
        Ok(Self {
            base,
            redirects: Vec::new(),
            cookies,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        let Ok(candidate) = Url::parse(url.trim()) else {
            return false;
        };
        candidate.scheme() == self.base.scheme()
            && candidate.host_str() == self.base.host_str()
            && candidate.port_or_known_default() == self.base.port_or_known_default()
            && candidate
                .path()
                .starts_with(self.base.path().trim_end_matches('/'))
    }

    pub fn on_before_request(&mut self, url: &str) -> AppResult<RequestDisposition> {
        if !self.matches(url) {
            return Ok(RequestDisposition::Continue);
        }
        self.record(url)?;
        Ok(RequestDisposition::Cancel)
    }

    fn record(&mut self, url: &str) -> AppResult<()> {
        self.redirects.push(url.trim().to_string());
        tracing::info!(captured = self.redirects.len(), "oauth redirect captured");
        self.cookies.clear_auth_cookies().map_err(|e| {
            tracing::error!("auth cookie clear failed after redirect capture: {}", e);
            e
        })
    }

    pub fn redirects(&self) -> &[String] {
        &self.redirects
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }

    pub fn into_redirects(self) -> Vec<String> {
        self.redirects
    }

    fn absolute_from_target(&self, target: &str) -> AppResult<String> {
        let mut origin = self.base.clone();
        origin.set_query(None);
        origin.set_fragment(None);
        origin.set_path("");
        let origin = origin.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{origin}{target}"))
            .map_err(|e| format!("NETWORK_ERROR: invalid redirect request target: {e}"))?;
        Ok(url.to_string())
    }
}

#[derive(Debug)]
pub struct BoundRedirectListener {
    port: u16,
    listener_v4: Option<TcpListener>,
    listener_v6: Option<TcpListener>,
}

impl BoundRedirectListener {
    pub fn port(&self) -> u16 {
        self.port
    }
}

fn is_loopback_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}

/// Binds the redirect URI's port on loopback (IPv4 and IPv6 where available).
/// Port 0 binds a dynamic port; read it back with [`BoundRedirectListener::port`].
pub async fn bind_redirect_listener(redirect_uri: &str) -> AppResult<BoundRedirectListener> {
    let url = Url::parse(redirect_uri.trim())
        .map_err(|e| format!("SEC_INVALID_INPUT: invalid redirect uri: {e}"))?;
    let host = url.host_str().unwrap_or_default();
    if url.scheme() != "http" || !is_loopback_host(host) {
        return Err(format!(
            "SEC_INVALID_INPUT: loopback capture needs an http://localhost redirect uri, got {redirect_uri}"
        )
        .into());
    }
    let port = url.port_or_known_default().unwrap_or(80);
    try_bind_on_port(port)
        .await
        .map_err(|e| format!("NETWORK_ERROR: redirect listener bind failed: {e}").into())
}

async fn try_bind_on_port(port: u16) -> Result<BoundRedirectListener, String> {
    if port == 0 {
        return try_bind_dynamic_port().await;
    }

    let mut bind_errors: Vec<String> = Vec::new();
    let listener_v4 = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => Some(listener),
        Err(err) => {
            bind_errors.push(format!("127.0.0.1:{port} ({err})"));
            None
        }
    };
    let listener_v6 = match TcpListener::bind(("::1", port)).await {
        Ok(listener) => Some(listener),
        Err(err) => {
            bind_errors.push(format!("::1:{port} ({err})"));
            None
        }
    };
    if listener_v4.is_none() && listener_v6.is_none() {
        return Err(bind_errors.join("; "));
    }

    Ok(BoundRedirectListener {
        port,
        listener_v4,
        listener_v6,
    })
}

async fn try_bind_dynamic_port() -> Result<BoundRedirectListener, String> {
    let listener_v4 = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|e| format!("127.0.0.1:0 ({e})"))?;
    let port = listener_v4
        .local_addr()
        .map_err(|e| format!("127.0.0.1:0 (local_addr failed: {e})"))?
        .port();
    let listener_v6 = TcpListener::bind(("::1", port)).await.ok();
    Ok(BoundRedirectListener {
        port,
        listener_v4: Some(listener_v4),
        listener_v6,
    })
}

async fn accept_one(listener: &mut BoundRedirectListener) -> std::io::Result<TcpStream> {
    let (socket, _) = match (listener.listener_v4.as_mut(), listener.listener_v6.as_mut()) {
        (Some(v4), Some(v6)) => {
            tokio::select! {
                result = v4.accept() => result?,
                result = v6.accept() => result?,
            }
        }
        (Some(v4), None) => v4.accept().await?,
        (None, Some(v6)) => v6.accept().await?,
        (None, None) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no redirect listener bound",
            ))
        }
    };
    Ok(socket)
}

/// Serves the loopback redirect URI until `count` redirects are captured in total.
/// Each individual wait is bounded by `timeout`.
pub async fn capture_redirects<C: AuthCookieStore>(
    listener: &mut BoundRedirectListener,
    capture: &mut RedirectCapture<C>,
    count: usize,
    timeout: Duration,
) -> AppResult<()> {
    while capture.len() < count {
        let mut socket = tokio::time::timeout(timeout, accept_one(listener))
            .await
            .map_err(|_| "NETWORK_ERROR: timed out waiting for oauth redirect".to_string())?
            .map_err(|e| format!("NETWORK_ERROR: redirect accept failed: {e}"))?;

        let mut buffer = vec![0u8; 8192];
        let size = socket
            .read(&mut buffer)
            .await
            .map_err(|e| format!("NETWORK_ERROR: redirect read failed: {e}"))?;
        if size == 0 {
            continue;
        }

        let request = String::from_utf8_lossy(&buffer[..size]);
        let Some(target) = extract_request_target(request.as_ref()) else {
            respond(&mut socket, "HTTP/1.1 400 Bad Request", ERROR_HTML).await;
            continue;
        };
        let url = capture.absolute_from_target(target)?;
        if !capture.matches(&url) {
            respond(&mut socket, "HTTP/1.1 404 Not Found", NOT_FOUND_HTML).await;
            continue;
        }

        let is_error = url.contains("error=");
        capture.record(&url)?;
        if is_error {
            respond(&mut socket, "HTTP/1.1 400 Bad Request", ERROR_HTML).await;
        } else {
            respond(&mut socket, "HTTP/1.1 200 OK", SUCCESS_HTML).await;
        }
    }
    Ok(())
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "{status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn extract_request_target(request: &str) -> Option<&str> {
    let first = request.lines().next()?;
    let mut parts = first.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    if method != "GET" || !target.starts_with('/') {
        return None;
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingCookies(Arc<AtomicUsize>);

    impl AuthCookieStore for CountingCookies {
        fn clear_auth_cookies(&mut self) -> AppResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenCookies;

    impl AuthCookieStore for BrokenCookies {
        fn clear_auth_cookies(&mut self) -> AppResult<()> {
            Err("INTERNAL_ERROR: cookie store unavailable".into())
        }
    }

    #[test]
    fn extract_request_target_requires_get() {
        assert_eq!(
            extract_request_target("GET /oauth/callback?code=a HTTP/1.1\r\n"),
            Some("/oauth/callback?code=a")
        );
        assert_eq!(extract_request_target("POST /oauth/callback HTTP/1.1\r\n"), None);
        assert_eq!(extract_request_target(""), None);
    }

    #[test]
    fn before_request_hook_captures_matching_urls_and_clears_cookies() {
        let cookies = CountingCookies::default();
        let mut capture =
            RedirectCapture::new("https://migrationtool.com", cookies.clone()).expect("capture");

        assert_eq!(
            capture
                .on_before_request("https://secure.na1.adobesign.com/public/oauth/v2?x=1")
                .expect("hook"),
            RequestDisposition::Continue
        );
        assert_eq!(
            capture
                .on_before_request("https://migrationtool.com/?code=a&state=s1")
                .expect("hook"),
            RequestDisposition::Cancel
        );
        assert_eq!(
            capture
                .on_before_request("https://migrationtool.com/?code=b&state=s2")
                .expect("hook"),
            RequestDisposition::Cancel
        );

        assert_eq!(cookies.0.load(Ordering::SeqCst), 2);
        assert_eq!(
            capture.redirects(),
            [
                "https://migrationtool.com/?code=a&state=s1",
                "https://migrationtool.com/?code=b&state=s2"
            ]
        );
    }

    #[test]
    fn cookie_clear_failure_is_surfaced() {
        let mut capture =
            RedirectCapture::new("https://migrationtool.com", BrokenCookies).expect("capture");
        let err = capture
            .on_before_request("https://migrationtool.com/?code=a&state=s1")
            .expect_err("clear failure must surface");
        assert!(err.message().contains("cookie store"));
    }

    #[test]
    fn matching_respects_path_and_port() {
        let capture = RedirectCapture::new(
            "http://localhost:43117/oauth/callback",
            CountingCookies::default(),
        )
        .expect("capture");
        assert!(capture.matches("http://localhost:43117/oauth/callback?code=a"));
        assert!(!capture.matches("http://localhost:43118/oauth/callback?code=a"));
        assert!(!capture.matches("http://localhost:43117/favicon.ico"));
    }

    #[tokio::test]
    async fn bind_rejects_non_loopback_redirect_uri() {
        let err = bind_redirect_listener("https://migrationtool.com/")
            .await
            .expect_err("must reject");
        assert!(err.message().contains("loopback"));
    }

    #[tokio::test]
    async fn loopback_listener_captures_two_redirects_in_order() {
        let mut listener = bind_redirect_listener("http://127.0.0.1:0/oauth/callback")
            .await
            .expect("bind");
        let port = listener.port();
        let cookies = CountingCookies::default();
        let redirect_uri = format!("http://127.0.0.1:{port}/oauth/callback");
        let mut capture = RedirectCapture::new(&redirect_uri, cookies.clone()).expect("capture");

        let server = tokio::spawn(async move {
            capture_redirects(&mut listener, &mut capture, 2, Duration::from_secs(10))
                .await
                .map(|_| capture.into_redirects())
        });

        let client = reqwest::Client::new();
        let miss = client
            .get(format!("http://127.0.0.1:{port}/favicon.ico"))
            .send()
            .await
            .expect("favicon");
        assert_eq!(miss.status().as_u16(), 404);
        for (code, state) in [("first", "s1"), ("second", "s2")] {
            let response = client
                .get(format!("{redirect_uri}?code={code}&state={state}"))
                .send()
                .await
                .expect("redirect");
            assert!(response.status().is_success());
        }

        let redirects = server.await.expect("join").expect("capture");
        assert_eq!(redirects.len(), 2);
        assert!(redirects[0].contains("code=first"));
        assert!(redirects[1].contains("code=second"));
        assert_eq!(cookies.0.load(Ordering::SeqCst), 2);
    }
}
