use std::env;
use tail_cgi::{
    CgiRequest, CgiResponse, DEFAULT_LOG_FILTER, Error, NotifySource, Settings, StreamOutcome,
    serve,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let settings = Settings::from_env();
    init_logging(&settings.log_filter);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown requested");
        signal_cancel.cancel();
    });

    let outcome = respond(&settings, &cancel).await;
    info!(status = outcome.status_code(), "request finished");
}

async fn respond(settings: &Settings, cancel: &CancellationToken) -> StreamOutcome {
    let out = tokio::io::stdout();

    if env::args_os().len() != 1 {
        return CgiResponse::new(out).reject(Error::UnexpectedArguments).await;
    }

    let request = match CgiRequest::from_env() {
        Ok(request) => request,
        Err(error) => return CgiResponse::new(out).reject(error).await,
    };
    info!(method = %request.method, path = %request.path, "tail request");

    serve(&request.path, &settings.root, NotifySource, out, cancel).await
}

/// Initialize the tracing subscriber for logging. Stdout is the response, so
/// logs go to stderr, where the web server collects them.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
