//! Authenticated feed fetching.
//!
//! [`FeedClient`] owns the fetch-parse-retry pipeline: it builds the feed
//! URL, attaches an auth header when a credential provider is configured,
//! performs the GET through a pluggable [`Transport`], and parses 200
//! responses into the generic document shape. A 401 response triggers a
//! forced credential refresh and a bounded retry with exponential backoff.

use crate::common::{Error, Result};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::document::{XmlValue, parse_document};
use super::url::{FeedKind, Visibility, feed_url};

const AUTHORIZATION: &str = "Authorization";

/// A plain HTTP response: status code and body text.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// The HTTP layer the client fetches through.
///
/// Only GET is ever issued; the transport receives the full URL and the
/// headers to attach.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<Response>;
}

/// Produces `Authorization` header values.
///
/// `force_refresh` is set when the previous header was rejected with a 401
/// and the provider should mint a fresh token.
#[allow(async_fn_in_trait)]
pub trait AuthProvider: Send + Sync {
    async fn auth_header(&self, force_refresh: bool) -> Result<String>;
}

/// Default transport over a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HttpTransport {
    async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<Response> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Response { status, body })
    }
}

/// Uninhabited provider type for unauthenticated clients.
///
/// `FeedClient<T, NoAuth>` can never hold a provider, so such a client
/// always fetches under public visibility.
#[derive(Debug, Clone, Copy)]
pub enum NoAuth {}

impl AuthProvider for NoAuth {
    async fn auth_header(&self, _force_refresh: bool) -> Result<String> {
        match *self {}
    }
}

/// Tunables for the fetch protocol.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Deadline for a single fetch, including the transport round trip
    pub timeout: Duration,
    /// Forced credential refreshes allowed before giving up on a 401 loop
    pub max_auth_retries: u32,
    /// Base backoff between 401 retries; doubles per attempt
    pub retry_backoff: Duration,
    /// Locale query parameter appended to every feed URL
    pub locale: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            timeout: Duration::from_secs(30),
            max_auth_retries: 3,
            retry_backoff: Duration::from_millis(250),
            locale: "en".to_string(),
        }
    }
}

/// Fetches and parses feed documents. Stateless across calls.
pub struct FeedClient<T = HttpTransport, A = NoAuth> {
    transport: T,
    auth: Option<A>,
    config: FeedConfig,
}

impl FeedClient {
    /// A public-visibility client over the default HTTP transport.
    pub fn public() -> Self {
        FeedClient {
            transport: HttpTransport::new(),
            auth: None,
            config: FeedConfig::default(),
        }
    }
}

impl<T: Transport, A: AuthProvider> FeedClient<T, A> {
    pub fn new(transport: T, auth: Option<A>, config: FeedConfig) -> Self {
        FeedClient {
            transport,
            auth,
            config,
        }
    }

    /// `private` iff a credential provider is configured.
    pub fn visibility(&self) -> Visibility {
        if self.auth.is_some() {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Fetch one feed document and parse it.
    ///
    /// `worksheet_id` is required for row and cell feeds; `entry_id` scopes
    /// the fetch to a single entry.
    pub async fn fetch_feed(
        &self,
        kind: FeedKind,
        key: &str,
        worksheet_id: Option<&str>,
        entry_id: Option<&str>,
    ) -> Result<XmlValue> {
        let url = feed_url(
            kind,
            key,
            worksheet_id,
            self.visibility(),
            entry_id,
            &self.config.locale,
        );
        self.fetch(&url).await
    }

    async fn fetch(&self, url: &str) -> Result<XmlValue> {
        let mut headers = Vec::new();
        if let Some(auth) = &self.auth {
            headers.push((AUTHORIZATION.to_string(), auth.auth_header(false).await?));
        }

        let mut attempt = 0u32;
        loop {
            debug!(url, attempt, "fetching feed");
            let response = match timeout(self.config.timeout, self.transport.request(url, &headers))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(Error::Timeout(self.config.timeout)),
            };

            match response.status {
                200 => return parse_document(&response.body),
                401 => {
                    // Without a refresh path a 401 is just a failed request.
                    let Some(auth) = &self.auth else {
                        return Err(Error::RemoteFeed {
                            status: response.status,
                            body: response.body,
                        });
                    };
                    attempt += 1;
                    if attempt > self.config.max_auth_retries {
                        return Err(Error::Auth {
                            attempts: self.config.max_auth_retries,
                        });
                    }
                    warn!(url, attempt, "unauthorized response, refreshing credentials");
                    sleep(backoff(self.config.retry_backoff, attempt)).await;
                    headers.clear();
                    headers.push((AUTHORIZATION.to_string(), auth.auth_header(true).await?));
                },
                status => {
                    return Err(Error::RemoteFeed {
                        status,
                        body: response.body,
                    });
                },
            }
        }
    }
}

/// Exponential backoff for retry `attempt` (1-based), saturating instead of
/// overflowing for large retry caps.
fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport and credential provider for tests.

    use super::{AuthProvider, Response, Transport};
    use crate::common::{Error, Result};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct TransportState {
        queue: Mutex<VecDeque<Response>>,
        routes: Mutex<Vec<(String, Response)>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
        fail_next: Mutex<bool>,
        stall: Mutex<bool>,
    }

    /// Transport answering from a scripted queue, or from URL-substring
    /// routes when the queue is empty. Clones share state.
    #[derive(Clone, Default)]
    pub(crate) struct MockTransport {
        state: Arc<TransportState>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response served to the next request.
        pub fn push(&self, status: u16, body: &str) {
            self.state.queue.lock().unwrap().push_back(Response {
                status,
                body: body.to_string(),
            });
        }

        /// Serve `body` to any request whose URL contains `fragment`.
        pub fn route(&self, fragment: &str, status: u16, body: &str) {
            self.state.routes.lock().unwrap().push((
                fragment.to_string(),
                Response {
                    status,
                    body: body.to_string(),
                },
            ));
        }

        /// Fail the next request with a transport error.
        pub fn fail_next(&self) {
            *self.state.fail_next.lock().unwrap() = true;
        }

        /// Leave every further request pending forever.
        pub fn stall(&self) {
            *self.state.stall.lock().unwrap() = true;
        }

        pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.state.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.state.requests.lock().unwrap().len()
        }
    }

    impl Transport for MockTransport {
        async fn request(&self, url: &str, headers: &[(String, String)]) -> Result<Response> {
            self.state
                .requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers.to_vec()));

            if std::mem::take(&mut *self.state.fail_next.lock().unwrap()) {
                return Err(Error::Transport("connection reset".into()));
            }

            let stalled = *self.state.stall.lock().unwrap();
            if stalled {
                std::future::pending::<()>().await;
            }

            if let Some(response) = self.state.queue.lock().unwrap().pop_front() {
                return Ok(response);
            }
            let routes = self.state.routes.lock().unwrap();
            for (fragment, response) in routes.iter() {
                if url.contains(fragment.as_str()) {
                    return Ok(response.clone());
                }
            }
            panic!("unexpected request: {url}");
        }
    }

    /// Credential provider recording every `force_refresh` flag it sees.
    #[derive(Clone, Default)]
    pub(crate) struct MockAuth {
        calls: Arc<Mutex<Vec<bool>>>,
    }

    impl MockAuth {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AuthProvider for MockAuth {
        async fn auth_header(&self, force_refresh: bool) -> Result<String> {
            self.calls.lock().unwrap().push(force_refresh);
            if force_refresh {
                Ok("Bearer refreshed".to_string())
            } else {
                Ok("Bearer initial".to_string())
            }
        }
    }
}
