//! The per-completion snapshot a log line is rendered from.

use std::borrow::Cow;
use std::net::IpAddr;
use std::time::Duration;

use http::{HeaderMap, Method};

use crate::request::RequestHead;
use crate::response::ResponseHead;

/// Which side of the exchange a record was taken on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Logged on arrival, before any response exists (immediate mode).
    Incoming,
    /// Logged once the request completed or was abandoned.
    Outgoing,
}

impl Direction {
    /// `-->` for incoming, `<--` for outgoing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "-->",
            Self::Outgoing => "<--",
        }
    }
}

/// Everything known about one request at the moment it is logged.
///
/// Built fresh for every completion event and handed by reference to the
/// severity function and the [`Format`](crate::Format). Nothing here outlives
/// the log call.
///
/// `status_code` is `0` when no response exists yet: in immediate mode, or
/// when the request was dropped before the service answered.
#[derive(Debug)]
pub struct Metadata<'a> {
    pub remote_address: IpAddr,
    pub method: &'a Method,
    /// Mount prefix plus path and query, or `-`.
    pub url: &'a str,
    pub http_version: &'static str,
    /// Milliseconds since the hook ran.
    pub response_time: f64,
    pub response_hrtime: Duration,
    pub status_code: u16,
    pub req_headers: &'a HeaderMap,
    pub res_headers: &'a HeaderMap,
    pub request: &'a RequestHead,
    pub response: Option<ResponseHead<'a>>,
    pub direction: Direction,
}

/// A field value as seen by the template renderer.
pub(crate) enum Value<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    /// `[seconds, nanoseconds]`, indexable as `[0]` / `[1]`.
    Pair(u64, u64),
    Headers(&'a HeaderMap),
}

impl Metadata<'_> {
    /// Looks a field up by its template name (`status-code`, `req-headers`, …).
    pub(crate) fn get(&self, name: &str) -> Option<Value<'_>> {
        let value = match name {
            "remote-address" | "ip" => Value::Text(Cow::Owned(self.remote_address.to_string())),
            "method" => Value::Text(Cow::Borrowed(self.method.as_str())),
            "url" => Value::Text(Cow::Borrowed(self.url)),
            "http-version" => Value::Text(Cow::Borrowed(self.http_version)),
            "response-time" => Value::Number(self.response_time),
            "response-hrtime" => Value::Pair(
                self.response_hrtime.as_secs(),
                u64::from(self.response_hrtime.subsec_nanos()),
            ),
            "status-code" => Value::Number(f64::from(self.status_code)),
            "req-headers" => Value::Headers(self.req_headers),
            "res-headers" => Value::Headers(self.res_headers),
            "incoming" => Value::Text(Cow::Borrowed(self.direction.as_str())),
            _ => return None,
        };
        Some(value)
    }
}
