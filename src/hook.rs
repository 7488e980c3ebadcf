//! The per-request hook and its one-shot completion.
//!
//! ```text
//! logger.hook(&mut req)          pending: timer started, id + child logger in extensions
//!        ↓
//! inner service runs
//!        ↓
//! log.finish(&res)               ┐
//! log.fail(&err)                 ├ first one wins → one record
//! drop(log)                      ┘ (close: abandoned before a response)
//! ```
//!
//! In immediate mode the record is written inside `hook` and every later
//! event is a no-op.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::{HeaderMap, Request, Response};

use crate::logger::{Logger, RequestLogger};
use crate::metadata::{Direction, Metadata};
use crate::request::{RequestHead, RequestId};
use crate::response::ResponseHead;

/// An error handed to the hook by an upstream error handler.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// A failure that reached the log as text: a panic, or an inner-service
/// error that is neither a `tower::BoxError` nor a [`SharedError`].
///
/// Severity policies can `downcast_ref::<ServiceFailure>()` to tell it apart.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceFailure {
    message: String,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Built from a panic payload; keeps the panic message when it is text.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_owned());
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ServiceFailure {}

impl Logger {
    /// Starts logging `req`.
    ///
    /// Generates a [`RequestId`], stores it and a [`RequestLogger`] in the
    /// request's extensions, and returns the pending [`RequestLog`].
    pub fn hook<B>(&self, req: &mut Request<B>) -> RequestLog {
        self.hook_with_error(None, req)
    }

    /// Error-aware variant of [`hook`](Logger::hook) for use behind an error
    /// handler.
    ///
    /// `err` is shown to the severity policy when the record is written, and
    /// stays available through [`RequestLog::error`] so the caller can pass it
    /// on unchanged.
    pub fn hook_with_error<B>(&self, err: Option<SharedError>, req: &mut Request<B>) -> RequestLog {
        let started = Instant::now();

        let id = RequestId::generate();
        let log = self.child(Some(id.clone()));
        req.extensions_mut().insert(id);
        req.extensions_mut().insert(log.clone());

        let mut pending = RequestLog {
            state: Some(Pending {
                logger: self.clone(),
                log,
                head: RequestHead::capture(req),
                started,
            }),
            error: err,
        };

        if self.is_immediate() {
            pending.complete(Direction::Incoming, None, None);
        }
        pending
    }
}

/// A request that has not been logged yet.
///
/// Exactly one record is written per `RequestLog`, on whichever comes first:
/// [`finish`](RequestLog::finish), [`fail`](RequestLog::fail), or drop.
/// A drop that happens while the thread unwinds from a panic counts as a
/// failure (status 500), not as an abandoned request.
#[must_use = "dropping a RequestLog logs the request as abandoned"]
#[derive(Debug)]
pub struct RequestLog {
    state: Option<Pending>,
    error: Option<SharedError>,
}

#[derive(Debug)]
struct Pending {
    logger: Logger,
    log: RequestLogger,
    head: RequestHead,
    started: Instant,
}

impl RequestLog {
    /// The response was produced.
    pub fn finish<B>(&mut self, res: &Response<B>) {
        self.complete(Direction::Outgoing, Some(ResponseHead::of(res)), None);
    }

    /// The continuation failed without a response. Logged as a 500 with `err`
    /// shown to the severity policy.
    pub fn fail(&mut self, err: &(dyn StdError + 'static)) {
        self.complete(Direction::Outgoing, None, Some(err));
    }

    /// Whether the record has been written.
    pub fn is_logged(&self) -> bool {
        self.state.is_none()
    }

    /// The error passed to [`Logger::hook_with_error`], untouched.
    pub fn error(&self) -> Option<&SharedError> {
        self.error.as_ref()
    }

    fn complete(
        &mut self,
        direction: Direction,
        response: Option<ResponseHead<'_>>,
        failure: Option<&(dyn StdError + 'static)>,
    ) {
        let Some(pending) = self.state.take() else {
            return;
        };

        let status = match (&response, failure) {
            (Some(res), _) => res.status.as_u16(),
            (None, Some(_)) => 500,
            (None, None) => 0,
        };
        let upstream = self.error.as_deref().map(|e| e as &(dyn StdError + 'static));
        pending.emit(direction, status, response, failure.or(upstream));
    }
}

impl Drop for RequestLog {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let failure = ServiceFailure::new("handler panicked");
            self.complete(Direction::Outgoing, None, Some(&failure));
        } else {
            self.complete(Direction::Outgoing, None, None);
        }
    }
}

impl Pending {
    fn emit(
        self,
        direction: Direction,
        status: u16,
        response: Option<ResponseHead<'_>>,
        err: Option<&(dyn StdError + 'static)>,
    ) {
        let hrtime = self.started.elapsed();
        let empty = HeaderMap::new();
        let res_headers = response.as_ref().map_or(&empty, |res| res.headers);

        let meta = Metadata {
            remote_address: self.head.remote_address(),
            method: self.head.method(),
            url: self.head.url(),
            http_version: self.head.http_version(),
            response_time: hrtime.as_secs_f64() * 1e3,
            response_hrtime: hrtime,
            status_code: status,
            req_headers: self.head.headers(),
            res_headers,
            request: &self.head,
            response,
            direction,
        };

        let level = self.logger.level_for(status, err, &meta);
        let line = self.logger.format().render(&meta);
        self.log.record(level, &line, &meta);
    }
}
