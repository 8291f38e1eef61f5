//! Verdict types and the allow-listed header relay.

use http::header::{HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use regex::{NoExpand, Regex};
use std::collections::HashSet;

/// Outcome of one classification, as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictKind {
    /// Not a bot; relay headers and continue
    Allow,
    /// Bot with a challenge or captcha URL
    Redirect(String),
    /// Bot without a redirect URL
    Block,
    /// The service rejected our credentials or request format (400)
    CredentialError,
    /// No answer before the deadline
    Timeout,
    /// Network or service failure
    UpstreamError,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Allow => "allow",
            VerdictKind::Redirect(_) => "redirect",
            VerdictKind::Block => "block",
            VerdictKind::CredentialError => "credential_error",
            VerdictKind::Timeout => "timeout",
            VerdictKind::UpstreamError => "upstream_error",
        }
    }
}

/// Result of one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    /// HTTP status returned by the service, or 408/500 on fallback
    pub status: u16,

    /// `x-datadome-isbot` was present with a non-empty value
    pub is_bot: bool,

    /// Redirect target from a non-200 JSON body
    pub redirect_url: Option<String>,

    /// Headers the service asked us to forward to the client
    pub headers: RelayHeaders,

    /// Bot name reported by the service (logging only)
    pub bot_name: Option<String>,

    /// Bot family reported by the service (logging only)
    pub bot_family: Option<String>,

    /// Synthesized locally because the service could not be reached
    pub degraded: bool,
}

impl Verdict {
    /// Fail-open verdict recorded with the given status.
    pub fn fail_open(status: u16) -> Self {
        Self {
            status,
            degraded: true,
            ..Self::default()
        }
    }

    /// Verdict for a call that missed its deadline.
    pub fn timeout() -> Self {
        Self::fail_open(408)
    }

    /// Verdict for a call that failed outright.
    pub fn upstream_error() -> Self {
        Self::fail_open(500)
    }

    /// Classify this verdict for the relay.
    pub fn kind(&self) -> VerdictKind {
        if self.degraded {
            return if self.status == 408 {
                VerdictKind::Timeout
            } else {
                VerdictKind::UpstreamError
            };
        }
        if self.status == 400 {
            return VerdictKind::CredentialError;
        }
        if self.is_bot {
            return match &self.redirect_url {
                Some(url) => VerdictKind::Redirect(url.clone()),
                None => VerdictKind::Block,
            };
        }
        VerdictKind::Allow
    }
}

/// Ordered header name/value pairs forwarded to the client.
///
/// Names may repeat (several `Set-Cookie` values).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayHeaders {
    entries: Vec<(String, String)>,
}

impl RelayHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for a name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write onto a response header map.
    ///
    /// `Set-Cookie` values are always appended so cookies set by the
    /// application survive. For other names the first value replaces what is
    /// there and later values of the same name are appended. Names or values
    /// that are not valid HTTP are skipped.
    pub fn apply_to(&self, target: &mut HeaderMap) {
        let mut seen: HashSet<HeaderName> = HashSet::new();

        for (name, value) in &self.entries {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::warn!(header = %name, "Skipping invalid relay header");
                continue;
            };

            if name != SET_COOKIE && seen.insert(name.clone()) {
                target.insert(name, value);
            } else {
                target.append(name, value);
            }
        }
    }
}

/// Rewrites a `Set-Cookie` scoped to a public suffix onto the request host.
///
/// Browsers refuse cookies with `Domain=.vercel.app` and similar public
/// suffixes, which the service sometimes issues.
#[derive(Debug, Clone)]
pub struct CookieDomainRewrite {
    pattern: Regex,
}

impl CookieDomainRewrite {
    pub fn new(public_suffix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("(?i)domain={}", regex::escape(public_suffix)))?;
        Ok(Self { pattern })
    }

    /// Rewrite the first `Domain=<suffix>` attribute to `Domain=<host>`.
    pub fn apply(&self, cookie: &str, host: &str) -> String {
        self.pattern
            .replace(cookie, NoExpand(&format!("Domain={}", host)))
            .into_owned()
    }

    /// Value to relay for one allow-listed header.
    pub fn relay_value(&self, name: &str, value: &str, host: Option<&str>) -> String {
        match host {
            Some(host) if name.eq_ignore_ascii_case(SET_COOKIE.as_str()) => self.apply(value, host),
            _ => value.to_string(),
        }
    }
}

/// Collect the headers named in the space-separated `list` from `response`.
///
/// Headers named but missing from the response are skipped. Every value of
/// a repeated header is kept.
pub fn collect_relay_headers(
    list: Option<&str>,
    response: &HeaderMap,
    host: Option<&str>,
    rewrite: &CookieDomainRewrite,
) -> RelayHeaders {
    let mut headers = RelayHeaders::new();

    for name in list.unwrap_or_default().split(' ').filter(|n| !n.is_empty()) {
        for value in response.get_all(name).iter() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers.insert(name, rewrite.relay_value(name, value, host));
        }
    }

    headers
}
