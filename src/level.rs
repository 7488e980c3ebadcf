//! Severity levels and the pluggable policy that picks one per request.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use crate::metadata::Metadata;

/// Severity of a log record.
///
/// `Fatal` has no `tracing` counterpart: it is emitted at `ERROR` and told
/// apart by the record's `severity` field.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Lowercase name, as written to the `severity` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info  => "info",
            Self::Warn  => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

/// Parses a lowercase level name (e.g. `"warn"`).
impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info"  => Ok(Self::Info),
            "warn"  => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _       => Err(()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the level for one completed request.
///
/// Returning `None` means "no opinion": the record is written at
/// [`Level::Info`].
///
/// You rarely implement this by hand. Any closure with the matching
/// signature qualifies:
///
/// ```rust
/// use reqlog::{Level, Logger};
///
/// let logger = Logger::builder()
///     .stream(std::io::sink)
///     .level_fn(|status, _err, meta| {
///         (meta.url == "/healthz" && status < 400).then_some(Level::Debug)
///     })
///     .build()
///     .unwrap();
/// ```
///
/// A panic inside the policy propagates out of the completion event into the
/// host. Keeping it panic-free is the caller's job.
pub trait LevelFn: Send + Sync + 'static {
    fn level(
        &self,
        status: u16,
        err: Option<&(dyn StdError + 'static)>,
        meta: &Metadata<'_>,
    ) -> Option<Level>;
}

impl<F> LevelFn for F
where
    F: Fn(u16, Option<&(dyn StdError + 'static)>, &Metadata<'_>) -> Option<Level>
        + Send
        + Sync
        + 'static,
{
    fn level(
        &self,
        status: u16,
        err: Option<&(dyn StdError + 'static)>,
        meta: &Metadata<'_>,
    ) -> Option<Level> {
        self(status, err, meta)
    }
}

/// The policy used when none is configured.
///
/// `Error` for any error or a 5xx, `Warn` for a 4xx, `Info` otherwise.
pub fn default_level(
    status: u16,
    err: Option<&(dyn StdError + 'static)>,
    _meta: &Metadata<'_>,
) -> Option<Level> {
    let level = if err.is_some() || status >= 500 {
        Level::Error
    } else if status >= 400 {
        Level::Warn
    } else {
        Level::Info
    };
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Direction;
    use crate::request::tests::sample_head;
    use http::HeaderMap;
    use std::time::Duration;

    fn level_for(status: u16, err: Option<&(dyn StdError + 'static)>) -> Option<Level> {
        let head = sample_head();
        let empty = HeaderMap::new();
        let meta = Metadata {
            remote_address: head.remote_address(),
            method: head.method(),
            url: head.url(),
            http_version: head.http_version(),
            response_time: 1.0,
            response_hrtime: Duration::from_millis(1),
            status_code: status,
            req_headers: head.headers(),
            res_headers: &empty,
            request: &head,
            response: None,
            direction: Direction::Outgoing,
        };
        default_level(status, err, &meta)
    }

    #[test]
    fn success_and_redirects_are_info() {
        assert_eq!(level_for(200, None), Some(Level::Info));
        assert_eq!(level_for(304, None), Some(Level::Info));
        assert_eq!(level_for(0, None), Some(Level::Info));
    }

    #[test]
    fn client_errors_are_warn() {
        assert_eq!(level_for(404, None), Some(Level::Warn));
        assert_eq!(level_for(499, None), Some(Level::Warn));
    }

    #[test]
    fn server_errors_and_failures_are_error() {
        let err = std::io::Error::other("boom");
        assert_eq!(level_for(500, None), Some(Level::Error));
        assert_eq!(level_for(200, Some(&err)), Some(Level::Error));
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for level in [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal] {
            assert_eq!(level.as_str().parse::<Level>(), Ok(level));
        }
        assert_eq!("WARN".parse::<Level>(), Err(()));
    }
}
