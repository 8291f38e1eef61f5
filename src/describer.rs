//! Request describer.
//!
//! Turns an inbound request into the flat [`RequestDescriptor`] that the
//! validation API classifies. Both relay variants adapt their request type
//! into [`InboundRequest`], so field extraction lives in one place.

use regex::Regex;
use std::sync::LazyLock;

/// Address assumed when no client IP header is present.
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Static assets never sent for classification.
static EXCLUDED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\.(avi|flv|mka|mkv|mov|mp4|mpeg|mpg|mp3|flac|ogg|ogm|opus|wav|webm|webp|bmp|gif|ico|jpeg|jpg|png|svg|svgz|swf|eot|otf|ttf|woff|woff2|css|less|js)$",
    )
    .unwrap()
});

/// Read-only view of an inbound HTTP request.
pub trait InboundRequest {
    /// HTTP method.
    fn method(&self) -> &str;

    /// Request host, from the `Host` header or the URI authority.
    fn host(&self) -> Option<&str>;

    /// Path without query string.
    fn path(&self) -> &str;

    /// Path including the query string, as received.
    fn path_and_query(&self) -> &str;

    /// Header names in arrival order, each listed once.
    fn header_names(&self) -> Vec<&str>;

    /// Every value of a header (case-insensitive name).
    fn header_values(&self, name: &str) -> Vec<&str>;

    /// First value of a header.
    fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }

    /// Cookies as `(name, value)` pairs across all `Cookie` headers.
    fn cookies(&self) -> Vec<(String, String)> {
        self.header_values("cookie")
            .into_iter()
            .flat_map(cookie::Cookie::split_parse)
            .filter_map(Result::ok)
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect()
    }

    /// Value of a single named cookie.
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

impl InboundRequest for http::request::Parts {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn host(&self) -> Option<&str> {
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.host())
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    fn header_names(&self) -> Vec<&str> {
        self.headers.keys().map(|k| k.as_str()).collect()
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

impl<B> InboundRequest for http::Request<B> {
    fn method(&self) -> &str {
        self.method().as_str()
    }

    fn host(&self) -> Option<&str> {
        self.headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri().host())
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn path_and_query(&self) -> &str {
        self.uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri().path())
    }

    fn header_names(&self) -> Vec<&str> {
        self.headers().keys().map(|k| k.as_str()).collect()
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

/// Why a request was not sent for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Path ends in a static-asset extension
    ExcludedPath,
    /// Client resolved to the loopback address
    Loopback,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ExcludedPath => "excluded_path",
            SkipReason::Loopback => "loopback",
        }
    }
}

/// Snapshot of one inbound request, as sent to the validation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub ip: String,
    pub method: String,
    pub host: Option<String>,
    /// Path and query string
    pub request: String,
    /// Comma-joined header names
    pub headers_list: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub accept_encoding: Option<String>,
    pub accept_language: Option<String>,
    pub accept_charset: Option<String>,
    pub origin: Option<String>,
    pub x_forwarded_for: Option<String>,
    pub connection: Option<String>,
    pub pragma: Option<String>,
    pub cache_control: Option<String>,
    pub content_type: Option<String>,
    pub from: Option<String>,
    pub via: Option<String>,
    /// Sum of all cookie value lengths
    pub cookies_len: usize,
    /// `None` when there is no `Authorization` header
    pub authorization_len: Option<usize>,
    pub content_length: Option<String>,
    /// Value of the client identifier cookie
    pub client_id: Option<String>,
}

impl RequestDescriptor {
    /// Describe a request. `client_id_cookie` names the cookie holding the
    /// client identifier.
    pub fn from_request<R: InboundRequest + ?Sized>(req: &R, client_id_cookie: &str) -> Self {
        let header = |name: &str| req.header(name).map(str::to_string);
        let cookies = req.cookies();

        Self {
            ip: resolve_ip(req),
            method: req.method().to_string(),
            host: req.host().map(str::to_string),
            request: req.path_and_query().to_string(),
            headers_list: req.header_names().join(","),
            user_agent: header("user-agent"),
            referer: header("referer"),
            accept_encoding: header("accept-encoding"),
            accept_language: header("accept-language"),
            accept_charset: header("accept-charset"),
            origin: header("origin"),
            x_forwarded_for: header("x-forwarded-for"),
            connection: header("connection"),
            pragma: header("pragma"),
            cache_control: header("cache-control"),
            content_type: header("content-type"),
            from: header("from"),
            via: header("via"),
            cookies_len: cookies_length(cookies.iter().map(|(_, v)| v)),
            authorization_len: authorization_length(req.header("authorization")),
            content_length: header("content-length"),
            client_id: cookies
                .iter()
                .find(|(name, _)| name == client_id_cookie)
                .map(|(_, v)| v.clone()),
        }
    }
}

/// Resolve the client IP: `x-real-ip`, then the first `x-forwarded-for`
/// entry, then loopback.
pub fn resolve_ip<R: InboundRequest + ?Sized>(req: &R) -> String {
    if let Some(ip) = req.header("x-real-ip").map(str::trim).filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }

    req.header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(LOOPBACK_IP)
        .to_string()
}

/// Returns true if the path names a static asset.
pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PATH.is_match(path)
}

/// Check whether a request bypasses classification.
pub fn inspection_skip<R: InboundRequest + ?Sized>(req: &R) -> Option<SkipReason> {
    if is_excluded_path(req.path()) {
        return Some(SkipReason::ExcludedPath);
    }
    if resolve_ip(req) == LOOPBACK_IP {
        return Some(SkipReason::Loopback);
    }
    None
}

/// Total byte length of all cookie values.
pub fn cookies_length<I, S>(values: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|v| v.as_ref().len()).sum()
}

/// Byte length of the `Authorization` header, `None` when absent.
pub fn authorization_length(authorization: Option<&str>) -> Option<usize> {
    authorization.map(str::len)
}
