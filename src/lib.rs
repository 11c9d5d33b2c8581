//! A CGI responder that tails a file over HTTP.
//!
//! One invocation answers one request: the file named by the request path is
//! sent as it currently is, then every append is streamed after it until the
//! client goes away, the watcher fails, or the process is told to stop.
//!
//! # Example
//!
//! ```rust,no_run
//! use tail_cgi::{CgiRequest, NotifySource, Settings, serve};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let request = CgiRequest::from_env()?;
//!     let cancel = CancellationToken::new();
//!
//!     let outcome = serve(&request.path, &settings.root, NotifySource, tokio::io::stdout(), &cancel).await;
//!     eprintln!("finished with status {}", outcome.status_code());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod path;
mod response;
mod tail;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use config::{CgiRequest, DEFAULT_LOG_FILTER, Settings};
pub use error::{Error, Result};
pub use path::{TailRequest, validate};
pub use response::{CgiResponse, ResponseHead, StreamOutcome};
pub use tail::{FileCursor, OpenTail, StopReason, Tail};
pub use watcher::{
    ChangeSource, EventInjector, FileChange, ManualSource, NotifySource, WatchEvent, WatchHandle,
};

use std::path::Path;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

/// Answers one request for `raw_path`, resolved under `root`, on `out`.
///
/// Returns the status the client was given. A stream that started is `Ok`
/// however it ended.
pub async fn serve<S, W>(
    raw_path: &str,
    root: &Path,
    source: S,
    out: W,
    cancel: &CancellationToken,
) -> StreamOutcome
where
    S: ChangeSource,
    W: AsyncWrite + Unpin,
{
    let mut response = CgiResponse::new(out);

    let request = match validate(raw_path) {
        Ok(request) => request,
        Err(error) => return response.reject(error).await,
    };

    Tail::new(root, source)
        .run(&request, &mut response, cancel)
        .await
}
