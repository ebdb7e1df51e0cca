use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Fake Autify Connect client for end-to-end testing
///
/// Speaks the same command line, stdout log format and debug server
/// protocol as the real client. Behavior flags make it misbehave on purpose.
#[derive(Parser, Debug)]
#[command(name = "fakeconnect")]
#[command(about = "Fake Autify Connect client for supervisor testing", long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// Print the version on stderr and exit
    #[arg(long)]
    version: bool,

    /// Only "json" is supported
    #[arg(long, default_value = "json")]
    log_format: String,

    /// Debug server port
    #[arg(long)]
    experimental_debug_server_port: Option<u16>,

    #[arg(long)]
    verbose: bool,

    /// Accepted like the real client, only logged
    #[arg(long)]
    tunnel_proxy: Option<String>,

    /// Version reported by --version
    #[arg(long, env = "FAKECONNECT_VERSION", default_value = "v1.1.0")]
    report_version: String,

    /// Milliseconds before logging the connected message
    #[arg(long, env = "FAKECONNECT_READY_AFTER_MS", default_value = "200")]
    ready_after_ms: u64,

    /// Never connect
    #[arg(long, env = "FAKECONNECT_NEVER_READY")]
    never_ready: bool,

    /// Accept POST /terminate but keep running
    #[arg(long, env = "FAKECONNECT_IGNORE_TERMINATE")]
    ignore_terminate: bool,

    /// Answer GET /status with a body that is not JSON
    #[arg(long, env = "FAKECONNECT_MALFORMED_STATUS")]
    malformed_status: bool,

    /// Exit code used after a graceful shutdown
    #[arg(long, env = "FAKECONNECT_EXIT_CODE", default_value = "0")]
    exit_code: i32,

    /// Exit on its own this many milliseconds after connecting
    #[arg(long, env = "FAKECONNECT_EXIT_AFTER_MS")]
    exit_after_ms: Option<u64>,

    /// Write the process ID here once running
    #[arg(long, env = "FAKECONNECT_PID_FILE")]
    pid_file: Option<PathBuf>,
}

struct FakeState {
    ready: AtomicBool,
    status_requests: AtomicU64,
    shutdown: Notify,
    ignore_terminate: bool,
    malformed_status: bool,
}

/// One record of the client's newline-delimited JSON log.
fn log_line(level: &str, msg: &str) {
    let record = serde_json::json!({
        "level": level,
        "msg": msg,
        "ts": chrono::Utc::now().to_rfc3339(),
    });
    println!("{}", record);
}

#[tokio::main]
async fn main() {
    // Own diagnostics go to stderr; stdout carries only the JSON log
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FAKECONNECT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    if args.version {
        eprintln!("{}", args.report_version);
        return;
    }

    if args.log_format != "json" {
        error!("Unsupported log format: {}", args.log_format);
        std::process::exit(2);
    }

    let key = std::env::var("AUTIFY_CONNECT_KEY").unwrap_or_default();
    if key.is_empty() {
        log_line("error", "AUTIFY_CONNECT_KEY is not set");
        std::process::exit(2);
    }

    let Some(port) = args.experimental_debug_server_port else {
        log_line("error", "--experimental-debug-server-port is required");
        std::process::exit(2);
    };

    if let Some(pid_file) = &args.pid_file {
        if let Err(e) = std::fs::write(pid_file, std::process::id().to_string()) {
            error!("Failed to write PID file: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(proxy) = &args.tunnel_proxy {
        log_line("info", &format!("Using tunnel proxy {}", proxy));
    }
    if args.verbose {
        log_line("debug", "Verbose logging enabled");
    }

    let state = Arc::new(FakeState {
        ready: AtomicBool::new(false),
        status_requests: AtomicU64::new(0),
        shutdown: Notify::new(),
        ignore_terminate: args.ignore_terminate,
        malformed_status: args.malformed_status,
    });

    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            log_line("error", &format!("Failed to bind debug server: {}", e));
            std::process::exit(1);
        }
    };
    tokio::spawn(serve(listener, Arc::clone(&state)));
    log_line("info", &format!("Debug server listening on 127.0.0.1:{}", port));
    log_line("info", "Connecting to Autify Connect Server");

    if !args.never_ready {
        let state = Arc::clone(&state);
        let ready_after = Duration::from_millis(args.ready_after_ms);
        let exit_after = args.exit_after_ms.map(Duration::from_millis);
        tokio::spawn(async move {
            tokio::time::sleep(ready_after).await;
            state.ready.store(true, Ordering::SeqCst);
            log_line("info", "Successfully connected!");

            if let Some(exit_after) = exit_after {
                tokio::time::sleep(exit_after).await;
                log_line("info", "Exiting on schedule");
                state.shutdown.notify_one();
            }
        });
    }

    state.shutdown.notified().await;
    info!(
        status_requests = state.status_requests.load(Ordering::SeqCst),
        "Shutting down"
    );
    log_line("info", "Disconnected from Autify Connect Server");
    // Let the /terminate response go out
    tokio::time::sleep(Duration::from_millis(50)).await;
    std::process::exit(args.exit_code);
}

async fn serve(listener: TcpListener, state: Arc<FakeState>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = Arc::clone(&state);
                async move { Ok::<_, Infallible>(handle(&state, &req)) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Debug server connection error: {}", e);
            }
        });
    }
}

fn handle(state: &FakeState, req: &Request<Incoming>) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/status") => {
            state.status_requests.fetch_add(1, Ordering::SeqCst);
            if state.malformed_status {
                return reply(StatusCode::OK, "not a status".to_string());
            }
            let body = if state.ready.load(Ordering::SeqCst) {
                serde_json::json!({ "status": "ready", "message": "Connected" })
            } else {
                serde_json::json!({ "status": "starting", "message": "Connecting" })
            };
            reply(StatusCode::OK, body.to_string())
        }
        (&Method::POST, "/terminate") => {
            if state.ignore_terminate {
                log_line("warn", "Terminate requested, ignoring");
            } else {
                log_line("info", "Terminate requested");
                state.shutdown.notify_one();
            }
            reply(StatusCode::OK, "{}".to_string())
        }
        _ => reply(StatusCode::NOT_FOUND, String::new()),
    }
}

fn reply(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}
