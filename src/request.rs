//! Incoming request snapshot and the extension types the hook reads and writes.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use http::{HeaderMap, Method, Request, Uri, Version};

/// Identifier generated for every request (UUID v4).
///
/// The hook stores it in the request's extensions; handlers read it back with
/// `req.extensions().get::<RequestId>()`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client IP as resolved by the host, e.g. after trusting a proxy header.
/// Takes precedence over every transport address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientIp(pub IpAddr);

/// Peer address of the transport connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemoteAddr(pub SocketAddr);

/// Prefix a host router stripped from the URI before this layer saw it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasePath(pub String);

/// Snapshot of the request line and headers, taken when the hook runs.
///
/// The request itself moves on to the inner service; this is what stays
/// behind for the log line.
#[derive(Clone, Debug)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    url: String,
    remote_address: IpAddr,
}

impl RequestHead {
    pub(crate) fn capture<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
            url: url(req),
            remote_address: remote_address(req),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn url(&self) -> &str { &self.url }
    pub fn remote_address(&self) -> IpAddr { self.remote_address }

    /// `major.minor` as it appears after `HTTP/`.
    pub fn http_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "0.9",
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2.0",
            Version::HTTP_3 => "3.0",
            _ => "1.1",
        }
    }

    /// Case-insensitive header lookup. Non-ASCII values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// First present wins: host-resolved client IP, transport peer, a bare
/// `SocketAddr` extension, then loopback.
fn remote_address<B>(req: &Request<B>) -> IpAddr {
    let ext = req.extensions();
    ext.get::<ClientIp>()
        .map(|ip| ip.0)
        .or_else(|| ext.get::<RemoteAddr>().map(|addr| addr.0.ip()))
        .or_else(|| ext.get::<SocketAddr>().map(SocketAddr::ip))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn url<B>(req: &Request<B>) -> String {
    let base = req.extensions().get::<BasePath>().map_or("", |b| b.0.as_str());
    let path = req.uri().path_and_query().map_or("", |pq| pq.as_str());
    if base.is_empty() && path.is_empty() {
        return "-".to_owned();
    }
    format!("{base}{path}")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_head() -> RequestHead {
        let mut req = Request::get("/users/42?active=1")
            .header("user-agent", "curl/8.0")
            .body(())
            .unwrap();
        req.extensions_mut().insert(RemoteAddr("10.0.0.7:51000".parse().unwrap()));
        RequestHead::capture(&req)
    }

    #[test]
    fn client_ip_beats_transport_addresses() {
        let mut req = Request::get("/").body(()).unwrap();
        req.extensions_mut().insert(RemoteAddr("10.0.0.7:51000".parse().unwrap()));
        req.extensions_mut().insert("192.168.1.1:80".parse::<SocketAddr>().unwrap());
        req.extensions_mut().insert(ClientIp("203.0.113.9".parse().unwrap()));
        assert_eq!(remote_address(&req), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn remote_addr_beats_bare_socket_addr() {
        let mut req = Request::get("/").body(()).unwrap();
        req.extensions_mut().insert("192.168.1.1:80".parse::<SocketAddr>().unwrap());
        req.extensions_mut().insert(RemoteAddr("[::1]:9000".parse().unwrap()));
        assert_eq!(remote_address(&req), "::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn bare_socket_addr_is_used_when_alone() {
        let mut req = Request::get("/").body(()).unwrap();
        req.extensions_mut().insert("192.168.1.1:80".parse::<SocketAddr>().unwrap());
        assert_eq!(remote_address(&req), "192.168.1.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn falls_back_to_loopback() {
        let req = Request::get("/").body(()).unwrap();
        assert_eq!(remote_address(&req), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn url_includes_base_path_and_query() {
        let mut req = Request::get("/42?full=1").body(()).unwrap();
        req.extensions_mut().insert(BasePath("/users".to_owned()));
        assert_eq!(url(&req), "/users/42?full=1");
    }

    #[test]
    fn version_renders_major_minor() {
        let req = Request::get("/").version(Version::HTTP_2).body(()).unwrap();
        assert_eq!(RequestHead::capture(&req).http_version(), "2.0");
        assert_eq!(sample_head().http_version(), "1.1");
    }

    #[test]
    fn header_lookup_ignores_case() {
        assert_eq!(sample_head().header("User-Agent"), Some("curl/8.0"));
        assert_eq!(sample_head().header("accept"), None);
    }
}
