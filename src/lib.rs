//! # reqlog
//!
//! Per-request access logging for `http` / `tower` services.
//! One request in, one log line out.
//!
//! ## What it does
//!
//! For every request reqlog:
//!
//! - starts a timer and generates a request id (UUID v4);
//! - puts a [`RequestId`] and a request-scoped [`RequestLogger`] into the
//!   request's extensions, so handler logs carry the same `req_id`;
//! - when the response is produced (or the request is abandoned) renders a
//!   line from a [`Format`] template, picks a [`Level`] through a pluggable
//!   policy, and writes one structured record.
//!
//! What it leaves to others: serving HTTP, formatting and shipping records
//! (that is `tracing`'s job), rotation, persistence.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use reqlog::Logger;
//! use tower::Layer;
//!
//! let logger = Logger::builder()
//!     .name("api")
//!     .stream(std::io::stdout)
//!     .build()
//!     .expect("valid logger config");
//!
//! let app = tower::service_fn(|_req: http::Request<()>| async {
//!     Ok::<_, std::convert::Infallible>(http::Response::new(()))
//! });
//! let svc = logger.layer().layer(app);
//! ```
//!
//! Each record is one JSON object:
//!
//! ```text
//! {"timestamp":"…","level":"INFO","name":"api","req_id":"…","severity":"info",
//!  "status_code":200,…,"message":"10.0.0.7 <-- GET /users/42 HTTP/1.1 200 17 0.41 ms"}
//! ```
//!
//! ## Without tower
//!
//! [`Logger::hook`] and [`RequestLog`] expose the same lifecycle to hosts
//! that drive requests themselves: call `hook` on arrival, `finish` with the
//! response, or simply drop the `RequestLog` if the request is abandoned.

mod error;
mod format;
mod hook;
mod level;
mod logger;
mod metadata;
mod request;
mod response;

pub mod middleware;

pub use error::Error;
pub use format::{DEFAULT_FORMAT, Format};
pub use hook::{RequestLog, ServiceFailure, SharedError};
pub use level::{Level, LevelFn, default_level};
pub use logger::{DEFAULT_NAME, Logger, LoggerBuilder, RequestLogger};
pub use metadata::{Direction, Metadata};
pub use middleware::{RequestLogLayer, RequestLogService};
pub use request::{BasePath, ClientIp, RemoteAddr, RequestHead, RequestId};
pub use response::ResponseHead;
