mod powercap;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Payload the scheduler's capper POSTs to cap this node.
#[derive(Debug, Deserialize)]
struct Cap {
    #[serde(rename = "Percentage")]
    percentage: i64,
}

#[derive(Parser)]
#[command(name = "joule-rapld", about = "Node-local RAPL powercap daemon")]
struct Cli {
    #[arg(long, default_value = "9090")]
    port: u16,

    /// Powercap sysfs base directory
    #[arg(long, default_value = powercap::POWERCAP_DIR)]
    powercap_dir: PathBuf,

    /// Log to rolling daily files in this directory instead of stdout
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "rapld.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(
                    std::env::var("RUST_LOG").unwrap_or_else(|_| "joule_rapld=info".into()),
                )
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    std::env::var("RUST_LOG").unwrap_or_else(|_| "joule_rapld=info".into()),
                )
                .init();
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let base = Arc::new(cli.powercap_dir);

    let listener = TcpListener::bind(addr).await?;
    info!("RAPL daemon listening on {}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Accept error: {}", e);
                continue;
            }
        };

        let base = base.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let svc = service_fn(move |req| handle_request(req, base.clone()));
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, svc)
                .await
            {
                if !e.to_string().contains("connection closed") {
                    warn!("Connection error from {}: {}", peer, e);
                }
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    base: Arc<PathBuf>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/powercap") => {
            let body = req.into_body().collect().await?.to_bytes();
            Ok(powercap_endpoint(&body, &base))
        }
        (_, path) => {
            let body = format!("Unsupported endpoint {}", path);
            Ok(text_response(StatusCode::NOT_FOUND, body))
        }
    }
}

/// Handler for the powercapping HTTP API endpoint.
fn powercap_endpoint(body: &[u8], base: &std::path::Path) -> Response<Full<Bytes>> {
    let payload: Cap = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            return text_response(
                StatusCode::BAD_REQUEST,
                format!("error parsing payload: {}", e),
            );
        }
    };

    match powercap::cap_node(base, payload.percentage) {
        Ok(()) => {
            info!("Capped node at {} percent", payload.percentage);
            text_response(
                StatusCode::OK,
                format!("capped node at {} percent", payload.percentage),
            )
        }
        Err(e) => {
            warn!("Cap request failed: {}", e);
            text_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
