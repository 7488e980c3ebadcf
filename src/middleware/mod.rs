//! Tower middleware.
//!
//! [`RequestLogLayer`] wraps any `tower::Service` that speaks
//! `http::Request` / `http::Response`, so it drops into hyper, axum or tonic
//! stacks unchanged:
//!
//! ```rust,ignore
//! let logger = Logger::builder().stream(std::io::stdout).build()?;
//! let svc = ServiceBuilder::new().layer(logger.layer()).service(app);
//! ```
//!
//! The response future owns the request's [`RequestLog`]. Resolving it is
//! "finish"; dropping it first (client went away, timeout layer fired) is
//! "close". Either way exactly one record is written.
//!
//! A panic inside the inner future is logged as a 500 with a
//! [`ServiceFailure`] carrying the panic message, then resumed.
//!
//! The inner error type only needs `Display`. Tower's `BoxError` and
//! [`SharedError`] reach the severity policy as the boxed error itself; any
//! other error type reaches it as a [`ServiceFailure`] holding its message.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{BoxError, Layer, Service};

use crate::hook::{RequestLog, ServiceFailure, SharedError};
use crate::logger::Logger;

/// Layer that logs every request passing through it.
#[derive(Clone, Debug)]
pub struct RequestLogLayer {
    logger: Logger,
}

impl RequestLogLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Logger {
    /// Shorthand for `RequestLogLayer::new(self.clone())`.
    pub fn layer(&self) -> RequestLogLayer {
        RequestLogLayer::new(self.clone())
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner, logger: self.logger.clone() }
    }
}

/// Middleware produced by [`RequestLogLayer`].
///
/// Errors from the inner service are logged (status 500, error shown to the
/// severity policy) and returned untouched.
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner: S,
    logger: Logger,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: fmt::Display + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let log = self.logger.hook(&mut req);
        ResponseFuture { inner: Box::pin(self.inner.call(req)), log }
    }
}

/// Response future of [`RequestLogService`].
///
/// The inner future is boxed so this type stays `Unpin` without pin
/// projection.
pub struct ResponseFuture<F> {
    inner: Pin<Box<F>>,
    log: RequestLog,
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
    E: fmt::Display + 'static,
{
    type Output = Result<Response<B>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let polled = panic::catch_unwind(AssertUnwindSafe(|| this.inner.as_mut().poll(cx)));
        let output = match polled {
            Ok(Poll::Ready(output)) => output,
            Ok(Poll::Pending) => return Poll::Pending,
            Err(payload) => {
                this.log.fail(&ServiceFailure::from_panic(&*payload));
                panic::resume_unwind(payload);
            }
        };
        match &output {
            Ok(res) => this.log.finish(res),
            Err(err) => fail_with(&mut this.log, err),
        }
        Poll::Ready(output)
    }
}

fn fail_with<E: fmt::Display + 'static>(log: &mut RequestLog, err: &E) {
    let any: &dyn Any = err;
    if let Some(boxed) = any.downcast_ref::<BoxError>() {
        log.fail(&**boxed);
    } else if let Some(shared) = any.downcast_ref::<SharedError>() {
        log.fail(&**shared);
    } else {
        log.fail(&ServiceFailure::new(err.to_string()));
    }
}
