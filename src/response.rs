//! Borrowed view of an outgoing response.

use http::{HeaderMap, Response, StatusCode, Version};

/// The status line and headers of the response being logged.
#[derive(Clone, Copy, Debug)]
pub struct ResponseHead<'a> {
    pub status: StatusCode,
    pub version: Version,
    pub headers: &'a HeaderMap,
}

impl<'a> ResponseHead<'a> {
    pub(crate) fn of<B>(res: &'a Response<B>) -> Self {
        Self { status: res.status(), version: res.version(), headers: res.headers() }
    }

    /// Case-insensitive header lookup. Non-ASCII values read as absent.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
