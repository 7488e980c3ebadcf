//! Minimal reqlog example — a hyper server with access logging.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/missing      # logged at WARN
//!   curl http://localhost:3000/fail         # handler error, logged at ERROR

use std::fmt;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use reqlog::{Logger, RemoteAddr, RequestLogger};
use tokio::net::TcpListener;
use tower::{ServiceBuilder, ServiceExt, service_fn};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let logger = Logger::builder()
        .name("basic")
        .stream(std::io::stdout)
        .build()?;

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(addr = "0.0.0.0:3000", "listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let svc = ServiceBuilder::new()
                    .map_request(move |mut req: Request<Incoming>| {
                        req.extensions_mut().insert(RemoteAddr(remote_addr));
                        req
                    })
                    .layer(logger.layer())
                    .service(service_fn(route));

                // Handler errors are logged by reqlog, then turned into a 500
                // for the client.
                let svc = svc.map_result(|res| match res {
                    Ok(res) => Ok::<_, HandlerError>(res),
                    Err(_) => Ok(status(StatusCode::INTERNAL_SERVER_ERROR)),
                });

                tasks.spawn(async move {
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(svc))
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}

    info!("stopped");
    Ok(())
}

#[derive(Debug)]
struct HandlerError(&'static str);

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for HandlerError {}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, HandlerError> {
    let path = req.uri().path();

    if let Some(id) = path.strip_prefix("/users/") {
        if let Some(log) = req.extensions().get::<RequestLogger>() {
            log.info(format_args!("loading user {id}"));
        }
        let body = format!(r#"{{"id":"{id}","name":"alice"}}"#);
        return Ok(Response::builder()
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| status(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    match path {
        "/fail" => Err(HandlerError("boom")),
        _ => Ok(status(StatusCode::NOT_FOUND)),
    }
}

fn status(code: StatusCode) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = code;
    res
}
