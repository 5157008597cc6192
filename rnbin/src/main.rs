use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use http_body_util::Full;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rnbin::config::StoreArgs;
use rnbin::http_api::{HttpApi, DEFAULT_MAX_UPLOAD_SIZE};
use rnbin::inspect::{inspect_key, InspectKeyConfig};
use rnbin::metrics::PrometheusMetrics;
use rnbin::retrieve::{meta, retrieve, store, MetaConfig, RetrieveConfig, StoreConfig};

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
pub struct ServerConfig {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value = "8000")]
    port: u16,

    #[arg(long, default_value = "localhost")]
    metric_host: String,

    #[arg(long, default_value = "9100")]
    metric_port: u16,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, help = "Largest accepted upload body in bytes")]
    max_upload_size: usize,

    #[arg(
        long,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace). Can also be set via RUST_LOG env var"
    )]
    log_level: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the blob gateway
    Server(ServerConfig),

    /// Upload a local file
    Store(StoreConfig),

    /// Download a blob to a local file
    Retrieve(RetrieveConfig),

    /// Print the metadata of a blob
    Meta(MetaConfig),

    /// Decode a key without contacting the store
    InspectKey(InspectKeyConfig),
}

fn setup_tracing(log_level: &str) {
    // Try to use RUST_LOG env var first, fall back to CLI flag
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", log_level);
            EnvFilter::new("info")
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match &cli.command {
        Command::Server(config) => config.log_level.as_str(),
        _ => "info",
    };

    setup_tracing(log_level);

    match cli.command {
        Command::Server(config) => run(config)?,
        Command::Store(config) => store(config)?,
        Command::Retrieve(config) => retrieve(config)?,
        Command::Meta(config) => meta(config)?,
        Command::InspectKey(config) => inspect_key(config)?,
    }
    Ok(())
}

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;

#[tokio::main]
async fn run(args: ServerConfig) -> Result<()> {
    let metrics = PrometheusMetrics::new()?;
    let service = args.store.build_service(metrics.to_core_metrics()).await?;
    let api = HttpApi::new(Arc::new(service), metrics.clone(), args.max_upload_size);

    // API listener
    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    let local_addr = listener.local_addr()?;

    // metrics server
    let metrics_listener =
        tokio::net::TcpListener::bind((args.metric_host.as_str(), args.metric_port)).await?;
    let metrics_addr = metrics_listener.local_addr()?;

    info!("metrics server is running at http://{metrics_addr}");

    let http_server = ConnBuilder::new(TokioExecutor::new());
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();

    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());

    info!("server is running at http://{local_addr}");

    loop {
        tokio::select! {
            res = listener.accept() => {
                match res {
                    Ok((socket, _)) => {
                        let api = api.clone();
                        let handler = hyper::service::service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let api = api.clone();
                            async move { api.handle_request(req).await }
                        });
                        let conn = http_server.serve_connection(TokioIo::new(socket), handler);
                        let conn = graceful.watch(conn.into_owned());
                        tokio::spawn(async move {
                            let _ = conn.await;
                        });
                    }
                    Err(err) => {
                        tracing::error!("error accepting connection: {err}");
                    }
                }
            }
            res = metrics_listener.accept() => {
                match res {
                    Ok((socket, _)) => {
                        let metrics = metrics.clone();
                        let handler = hyper::service::service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let metrics = metrics.clone();
                            async move { Ok::<_, std::convert::Infallible>(metrics_response(&metrics, &req)) }
                        });
                        let conn = http_server.serve_connection(TokioIo::new(socket), handler);
                        let conn = graceful.watch(conn.into_owned());
                        tokio::spawn(async move {
                            let _ = conn.await;
                        });
                    }
                    Err(err) => {
                        tracing::error!("error accepting metrics connection: {err}");
                    }
                }
            }
            _ = ctrl_c.as_mut() => {
                break;
            }
        };
    }

    tokio::select! {
        () = graceful.shutdown() => {
             tracing::debug!("Gracefully shutdown!");
        },
        () = tokio::time::sleep(std::time::Duration::from_secs(10)) => {
             tracing::debug!("Waited 10 seconds for graceful shutdown, aborting...");
        }
    }

    info!("server is stopped");
    Ok(())
}

fn metrics_response<B>(
    metrics: &PrometheusMetrics,
    req: &hyper::Request<B>,
) -> hyper::Response<Full<Bytes>> {
    let mut resp = hyper::Response::new(Full::new(Bytes::new()));
    match (req.method(), req.uri().path()) {
        (&hyper::Method::GET, "/metrics") => match metrics.encode() {
            Ok(buffer) => {
                *resp.body_mut() = Full::new(Bytes::from(buffer));
                resp.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                );
            }
            Err(err) => {
                tracing::error!("failed to encode metrics: {err}");
                *resp.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            }
        },
        _ => {
            *resp.body_mut() = Full::new(Bytes::from("Not Found"));
            *resp.status_mut() = hyper::StatusCode::NOT_FOUND;
        }
    }
    resp
}
