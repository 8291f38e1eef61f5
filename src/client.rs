//! Verdict client for the DataDome validation API.

use crate::config::DataDomeConfig;
use crate::describer::RequestDescriptor;
use crate::error::{SetupError, ValidationError};
use crate::payload::VerdictPayload;
use crate::verdict::{collect_relay_headers, CookieDomainRewrite, Verdict};
use async_trait::async_trait;
use http::header::{CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

/// User-Agent the validation API expects from modules.
pub const MODULE_USER_AGENT: &str = "DataDome";

/// Present when the service flags the request as a bot.
pub const HEADER_IS_BOT: &str = "x-datadome-isbot";
/// Space-separated names of headers to forward to the client.
pub const HEADER_RELAY_LIST: &str = "x-datadome-headers";
pub const HEADER_BOT_NAME: &str = "x-datadome-botname";
pub const HEADER_BOT_FAMILY: &str = "x-datadome-botfamily";

/// Source of verdicts for the relay.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a request. Never fails; failures become fail-open verdicts.
    async fn classify(&self, descriptor: &RequestDescriptor) -> Verdict;
}

/// Body of a non-200 verdict.
#[derive(Debug, Deserialize)]
struct VerdictBody {
    #[serde(default)]
    url: Option<String>,
}

/// HTTP client for the validation API.
pub struct VerdictClient {
    http: reqwest::Client,
    config: DataDomeConfig,
    cookie_rewrite: CookieDomainRewrite,
}

impl VerdictClient {
    /// Create a client with its own connection pool.
    pub fn new(config: DataDomeConfig) -> Result<Self, SetupError> {
        let http = reqwest::Client::builder().build()?;
        Self::with_http_client(config, http)
    }

    /// Create a client sharing an existing connection pool.
    pub fn with_http_client(config: DataDomeConfig, http: reqwest::Client) -> Result<Self, SetupError> {
        if config.server_key.is_empty() {
            warn!("DataDome server key is empty, every validation will be rejected");
        }

        let cookie_rewrite = CookieDomainRewrite::new(&config.relay.public_suffix)?;

        Ok(Self {
            http,
            config,
            cookie_rewrite,
        })
    }

    pub fn config(&self) -> &DataDomeConfig {
        &self.config
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// One validation exchange bounded by the configured deadline.
    ///
    /// The deadline covers sending, headers and the body read. When it fires
    /// the in-flight exchange is dropped.
    async fn validate(&self, descriptor: &RequestDescriptor) -> Result<Verdict, ValidationError> {
        let payload = VerdictPayload::new(descriptor, &self.config);
        debug!(
            ip = %descriptor.ip,
            request = %descriptor.request,
            payload = ?payload.redacted(),
            "Sending DataDome validation request"
        );

        let exchange = async {
            let response = self
                .http
                .post(&self.config.api.endpoint)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(USER_AGENT, MODULE_USER_AGENT)
                .body(payload.encode())
                .send()
                .await?;

            Ok::<_, ValidationError>(self.interpret(response, descriptor.host.as_deref()).await)
        };

        let timeout = self.config.api.timeout();
        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ValidationError::Timeout(self.config.api.timeout_ms))?
    }

    /// Turn a completed response into a verdict.
    async fn interpret(&self, response: reqwest::Response, host: Option<&str>) -> Verdict {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        if status == 400 {
            warn!(status, "DataDome rejected the validation request, check the server key");
        }

        let is_bot = header(HEADER_IS_BOT).is_some_and(|v| !v.trim().is_empty());
        let bot_name = header(HEADER_BOT_NAME);
        let bot_family = header(HEADER_BOT_FAMILY);

        if is_bot {
            info!(
                bot_name = bot_name.as_deref().unwrap_or("unknown"),
                bot_family = bot_family.as_deref().unwrap_or("unknown"),
                "Bot detected"
            );
        }

        let redirect_url = if status != 200 {
            match response.bytes().await {
                Ok(body) => match parse_redirect_url(&body) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(status, error = %e, "Failed to parse DataDome response body");
                        None
                    }
                },
                Err(e) => {
                    warn!(status, error = %e, "Failed to read DataDome response body");
                    None
                }
            }
        } else {
            None
        };

        let relay_headers = collect_relay_headers(
            header(HEADER_RELAY_LIST).as_deref(),
            &headers,
            host,
            &self.cookie_rewrite,
        );

        let verdict = Verdict {
            status,
            is_bot,
            redirect_url,
            headers: relay_headers,
            bot_name,
            bot_family,
            degraded: false,
        };

        debug!(
            status = verdict.status,
            is_bot = verdict.is_bot,
            redirect_url = ?verdict.redirect_url,
            relay_headers = verdict.headers.len(),
            "DataDome verdict"
        );

        verdict
    }
}

#[async_trait]
impl Classifier for VerdictClient {
    async fn classify(&self, descriptor: &RequestDescriptor) -> Verdict {
        match self.validate(descriptor).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, ip = %descriptor.ip, "DataDome validation failed, allowing request");
                Verdict::fail_open(e.fallback_status())
            }
        }
    }
}

/// Extract the redirect URL from a non-200 verdict body.
///
/// An empty or missing `url` means there is nothing to redirect to.
pub fn parse_redirect_url(body: &[u8]) -> Result<Option<String>, ValidationError> {
    let body: VerdictBody = serde_json::from_slice(body)?;
    Ok(body.url.filter(|url| !url.is_empty()))
}
