//! Logger configuration and the request-scoped child logger.
//!
//! Records are written through an explicit [`tracing::Dispatch`], never the
//! global default. Either hand over a dispatcher you already run
//! ([`LoggerBuilder::logger`]) or give output streams and reqlog builds a JSON
//! subscriber over them ([`LoggerBuilder::stream`], [`LoggerBuilder::streams`]).
//! With neither, [`LoggerBuilder::build`] fails.

use std::fmt;
use std::sync::Arc;

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::error::Error;
use crate::format::{DEFAULT_FORMAT, Format};
use crate::level::{Level, LevelFn, default_level};
use crate::metadata::Metadata;
use crate::request::RequestId;

/// Display name bound to every record when none is configured.
pub const DEFAULT_NAME: &str = "http";

/// Emits one `tracing` event at a runtime-chosen [`Level`].
///
/// `tracing::event!` wants its level as a constant, hence one arm per level.
macro_rules! event_at {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Level::Trace => tracing::event!(tracing::Level::TRACE, $($rest)+),
            Level::Debug => tracing::event!(tracing::Level::DEBUG, $($rest)+),
            Level::Info  => tracing::event!(tracing::Level::INFO,  $($rest)+),
            Level::Warn  => tracing::event!(tracing::Level::WARN,  $($rest)+),
            Level::Error | Level::Fatal => tracing::event!(tracing::Level::ERROR, $($rest)+),
        }
    };
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Request-logging configuration, resolved once and shared by every request.
///
/// Cheap to clone: all state sits behind one `Arc` and is never mutated after
/// [`LoggerBuilder::build`].
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    format: Format,
    level_fn: Box<dyn LevelFn>,
    sink: Sink,
    immediate: bool,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn format(&self) -> &Format {
        &self.inner.format
    }

    pub fn is_immediate(&self) -> bool {
        self.inner.immediate
    }

    /// A child logger bound to `id`, or the base logger when `id` is `None`.
    pub fn child(&self, id: Option<RequestId>) -> RequestLogger {
        RequestLogger { sink: self.inner.sink.clone(), req_id: id }
    }

    pub(crate) fn level_for(
        &self,
        status: u16,
        err: Option<&(dyn std::error::Error + 'static)>,
        meta: &Metadata<'_>,
    ) -> Level {
        self.inner.level_fn.level(status, err, meta).unwrap_or(Level::Info)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.sink.name)
            .field("format", &self.inner.format)
            .field("immediate", &self.inner.immediate)
            .finish_non_exhaustive()
    }
}

// ── LoggerBuilder ─────────────────────────────────────────────────────────────

/// Fluent builder for [`Logger`].
///
/// ```rust
/// use reqlog::{Level, Logger};
///
/// let logger = Logger::builder()
///     .name("api")
///     .format(":method :url :status-code :response-time ms")
///     .stream(std::io::stdout)
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    format: String,
    name: String,
    level_fn: Box<dyn LevelFn>,
    logger: Option<Dispatch>,
    streams: Vec<BoxMakeWriter>,
    immediate: bool,
}

impl LoggerBuilder {
    fn new() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_owned(),
            name: DEFAULT_NAME.to_owned(),
            level_fn: Box::new(default_level),
            logger: None,
            streams: Vec::new(),
            immediate: false,
        }
    }

    /// Log-line template. See [`Format`] for the placeholder syntax.
    pub fn format(mut self, template: &str) -> Self {
        self.format = template.to_owned();
        self
    }

    /// Display name, bound on every record as the `name` field.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Replaces the default severity policy ([`default_level`]).
    pub fn level_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(u16, Option<&(dyn std::error::Error + 'static)>, &Metadata<'_>) -> Option<Level>
            + Send
            + Sync
            + 'static,
    {
        self.level_fn = Box::new(f);
        self
    }

    /// Like [`level_fn`](Self::level_fn), for a type implementing
    /// [`LevelFn`] itself.
    pub fn level_policy(mut self, policy: impl LevelFn) -> Self {
        self.level_fn = Box::new(policy);
        self
    }

    /// Writes records through an existing dispatcher. Takes precedence over
    /// any configured stream.
    pub fn logger(mut self, dispatch: Dispatch) -> Self {
        self.logger = Some(dispatch);
        self
    }

    /// Adds one output stream, e.g. `std::io::stdout`.
    pub fn stream<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.streams.push(BoxMakeWriter::new(writer));
        self
    }

    /// Adds several output streams. Every record is written to each of them.
    pub fn streams(mut self, writers: impl IntoIterator<Item = BoxMakeWriter>) -> Self {
        self.streams.extend(writers);
        self
    }

    /// Log on arrival instead of on completion.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Compiles the template and resolves the output.
    ///
    /// # Errors
    ///
    /// [`Error::Template`] for a malformed template, [`Error::MissingOutput`]
    /// when neither a logger nor a stream was given.
    pub fn build(self) -> Result<Logger, Error> {
        let format = Format::compile(&self.format)?;

        let dispatch = match self.logger {
            Some(dispatch) => dispatch,
            None => json_dispatch(self.streams)?,
        };

        Ok(Logger {
            inner: Arc::new(Inner {
                format,
                level_fn: self.level_fn,
                sink: Sink { dispatch, name: self.name.into() },
                immediate: self.immediate,
            }),
        })
    }
}

/// The default logger: one JSON object per line, fields flattened to the top
/// level, written to every stream.
fn json_dispatch(streams: Vec<BoxMakeWriter>) -> Result<Dispatch, Error> {
    let writer = streams
        .into_iter()
        .reduce(|all, next| BoxMakeWriter::new(all.and(next)))
        .ok_or(Error::MissingOutput)?;

    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(writer)
        .finish();

    Ok(Dispatch::new(subscriber))
}

// ── Sink ──────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Sink {
    dispatch: Dispatch,
    name: Arc<str>,
}

// ── RequestLogger ─────────────────────────────────────────────────────────────

/// Logger bound to one request's identifier.
///
/// The hook stores it in the request's extensions so handlers can log lines
/// that correlate with the access record:
///
/// ```rust,ignore
/// if let Some(log) = req.extensions().get::<RequestLogger>() {
///     log.info("cache miss");
/// }
/// ```
#[derive(Clone)]
pub struct RequestLogger {
    sink: Sink,
    req_id: Option<RequestId>,
}

impl RequestLogger {
    pub fn req_id(&self) -> Option<&RequestId> {
        self.req_id.as_ref()
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        let req_id = self.req_id.as_ref().map(RequestId::as_str);
        tracing::dispatcher::with_default(&self.sink.dispatch, || {
            event_at!(
                level,
                name = &*self.sink.name,
                req_id = req_id,
                severity = level.as_str(),
                "{}",
                message
            );
        });
    }

    pub fn trace(&self, message: impl fmt::Display) { self.log(Level::Trace, message) }
    pub fn debug(&self, message: impl fmt::Display) { self.log(Level::Debug, message) }
    pub fn info(&self, message: impl fmt::Display) { self.log(Level::Info, message) }
    pub fn warn(&self, message: impl fmt::Display) { self.log(Level::Warn, message) }
    pub fn error(&self, message: impl fmt::Display) { self.log(Level::Error, message) }
    pub fn fatal(&self, message: impl fmt::Display) { self.log(Level::Fatal, message) }

    /// Writes the access record for a completed request.
    pub(crate) fn record(&self, level: Level, line: &str, meta: &Metadata<'_>) {
        let req_id = self.req_id.as_ref().map(RequestId::as_str);
        tracing::dispatcher::with_default(&self.sink.dispatch, || {
            event_at!(
                level,
                name = &*self.sink.name,
                req_id = req_id,
                severity = level.as_str(),
                remote_address = %meta.remote_address,
                method = meta.method.as_str(),
                url = meta.url,
                http_version = meta.http_version,
                status_code = meta.status_code,
                response_time = meta.response_time,
                incoming = meta.direction.as_str(),
                "{}",
                line
            );
        });
    }
}

impl fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("name", &self.sink.name)
            .field("req_id", &self.req_id)
            .finish_non_exhaustive()
    }
}
