//! Wire form of a validation request.
//!
//! The validation API takes an `application/x-www-form-urlencoded` body.
//! Fields distinguish "not sent" from "sent without a value", so each field
//! carries a [`FormValue`] rather than an `Option`.

use crate::config::DataDomeConfig;
use crate::describer::RequestDescriptor;
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

/// Value of one payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue<'a> {
    /// Field is left out of the body entirely
    Absent,
    /// Field is sent as a bare key with no `=`
    Null,
    /// Field is sent as `key=value`
    Value(Cow<'a, str>),
}

impl<'a> FormValue<'a> {
    fn optional(value: Option<&'a str>) -> Self {
        value.map_or(FormValue::Absent, |v| FormValue::Value(Cow::Borrowed(v)))
    }

    fn owned(value: impl ToString) -> Self {
        FormValue::Value(Cow::Owned(value.to_string()))
    }
}

impl<'a> From<&'a str> for FormValue<'a> {
    fn from(value: &'a str) -> Self {
        FormValue::Value(Cow::Borrowed(value))
    }
}

/// Ordered payload fields for one validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictPayload<'a> {
    fields: Vec<(&'static str, FormValue<'a>)>,
}

impl<'a> VerdictPayload<'a> {
    /// Build the payload for a descriptor, stamped with the current time.
    pub fn new(descriptor: &'a RequestDescriptor, config: &'a DataDomeConfig) -> Self {
        Self::at(descriptor, config, now_micros())
    }

    /// Build the payload with an explicit `TimeRequest` in microseconds.
    pub fn at(descriptor: &'a RequestDescriptor, config: &'a DataDomeConfig, time_request: u128) -> Self {
        let d = descriptor;
        let module = &config.module;
        let host = FormValue::optional(d.host.as_deref());

        let fields = vec![
            ("Key", FormValue::from(config.server_key.as_str())),
            ("RequestModuleName", FormValue::from(module.name.as_str())),
            ("ModuleVersion", FormValue::from(module.version.as_str())),
            ("ServerName", FormValue::from(module.server_name.as_str())),
            ("IP", FormValue::from(d.ip.as_str())),
            ("Port", FormValue::from("0")),
            ("TimeRequest", FormValue::owned(time_request)),
            ("Protocol", FormValue::from("https")),
            ("Method", FormValue::from(d.method.as_str())),
            ("ServerHostname", host.clone()),
            ("Request", FormValue::from(d.request.as_str())),
            ("HeadersList", FormValue::from(d.headers_list.as_str())),
            ("Host", host),
            ("UserAgent", FormValue::optional(d.user_agent.as_deref())),
            ("Referer", FormValue::optional(d.referer.as_deref())),
            // Ask for a JSON body on non-200 verdicts
            ("Accept", FormValue::from("application/json")),
            ("AcceptEncoding", FormValue::optional(d.accept_encoding.as_deref())),
            ("AcceptLanguage", FormValue::optional(d.accept_language.as_deref())),
            ("AcceptCharset", FormValue::optional(d.accept_charset.as_deref())),
            ("Origin", FormValue::optional(d.origin.as_deref())),
            ("XForwaredForIP", FormValue::optional(d.x_forwarded_for.as_deref())),
            ("Connection", FormValue::optional(d.connection.as_deref())),
            ("Pragma", FormValue::optional(d.pragma.as_deref())),
            ("CacheControl", FormValue::optional(d.cache_control.as_deref())),
            ("ContentType", FormValue::optional(d.content_type.as_deref())),
            ("From", FormValue::optional(d.from.as_deref())),
            ("Via", FormValue::optional(d.via.as_deref())),
            ("CookiesLen", FormValue::owned(d.cookies_len)),
            (
                "AuthorizationLen",
                d.authorization_len.map_or(FormValue::Null, |len| FormValue::owned(len)),
            ),
            ("PostParamLen", FormValue::optional(d.content_length.as_deref())),
            ("ClientID", FormValue::optional(d.client_id.as_deref())),
            ("ServerRegion", FormValue::from(module.server_region.as_str())),
        ];

        Self { fields }
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&FormValue<'a>> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Serialize to the form body.
    pub fn encode(&self) -> String {
        encode_form(self.fields.iter().map(|(k, v)| (*k, v)))
    }

    /// Copy of the fields with the API key masked, for logging.
    pub fn redacted(&self) -> Vec<(&'static str, FormValue<'a>)> {
        self.fields
            .iter()
            .map(|(k, v)| match (*k, v) {
                ("Key", FormValue::Value(_)) => (*k, FormValue::from("***")),
                _ => (*k, v.clone()),
            })
            .collect()
    }
}

/// Percent-encode `key=value` pairs joined by `&`.
///
/// [`FormValue::Absent`] fields are dropped and [`FormValue::Null`] fields
/// become the bare encoded key.
pub fn encode_form<'a, 'v: 'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a FormValue<'v>)>,
{
    fields
        .into_iter()
        .filter_map(|(key, value)| match value {
            FormValue::Absent => None,
            FormValue::Null => Some(urlencoding::encode(key).into_owned()),
            FormValue::Value(v) => Some(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(v)
            )),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn now_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() * 1000)
        .unwrap_or_default()
}
