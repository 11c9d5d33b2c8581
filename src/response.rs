//! Status and header emission for the CGI response.
//!
//! A streamed body cannot change its status once the first byte is out, so
//! [`CgiResponse`] only lets the head be committed once and everything
//! written through [`CgiResponse::body`] afterwards belongs to that status.

use crate::error::Error;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// How an invocation ended, as far as the client's status code is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Ok,
    BadRequest(String),
    NotFound,
    InternalError(String),
}

impl StreamOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            StreamOutcome::Ok => 200,
            StreamOutcome::BadRequest(_) => 400,
            StreamOutcome::NotFound => 404,
            StreamOutcome::InternalError(_) => 500,
        }
    }

    /// Text shown to the client for a failed request.
    pub fn detail(&self) -> Option<&str> {
        match self {
            StreamOutcome::Ok => None,
            StreamOutcome::BadRequest(detail) | StreamOutcome::InternalError(detail) => {
                Some(detail.as_str())
            }
            StreamOutcome::NotFound => Some("file not found"),
        }
    }
}

/// Status line and headers for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
}

impl ResponseHead {
    /// Builds the head the client sees for `outcome`.
    ///
    /// The cache and buffering headers are present whatever the outcome: a
    /// proxy that buffers or caches a live stream breaks it.
    pub fn for_outcome(outcome: &StreamOutcome) -> Self {
        let content_type = match outcome {
            StreamOutcome::Ok => "text/plain; charset=utf-8",
            _ => "text/plain",
        };

        Self {
            status: outcome.status_code(),
            headers: vec![
                ("Cache-Control", "no-cache"),
                ("X-Accel-Buffering", "no"),
                ("Content-Type", content_type),
            ],
        }
    }

    /// Renders the head in CGI framing, `Status` last and a blank line to end it.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push_str(&format!(
            "Status: {} {}\n\n",
            self.status,
            reason_phrase(self.status)
        ));
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// The output side of one invocation.
pub struct CgiResponse<W> {
    inner: W,
    committed: bool,
}

impl<W: AsyncWrite + Unpin> CgiResponse<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            committed: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Writes the status and headers. Only the first call succeeds.
    pub async fn commit(&mut self, head: &ResponseHead) -> io::Result<()> {
        if self.committed {
            return Err(io::Error::other("response head already sent"));
        }
        // Set before writing: a half-written head is still a head.
        self.committed = true;
        self.inner.write_all(head.render().as_bytes()).await?;
        self.inner.flush().await
    }

    /// Commits an error head for `outcome` and writes its plain-text body.
    pub async fn send_error(&mut self, outcome: &StreamOutcome) -> io::Result<()> {
        self.commit(&ResponseHead::for_outcome(outcome)).await?;
        if let Some(detail) = outcome.detail() {
            self.inner
                .write_all(format!("Error: {detail}\n").as_bytes())
                .await?;
        }
        self.inner.flush().await
    }

    /// Answers with the status `error` maps to. Returns that outcome.
    pub async fn reject(&mut self, error: Error) -> StreamOutcome {
        warn!(file = error.path().unwrap_or_default(), %error, "rejecting request");
        let outcome = error.outcome();
        if let Err(error) = self.send_error(&outcome).await {
            debug!(%error, "failed to send error response");
        }
        outcome
    }

    /// Body writer. Writing here before [`commit`](Self::commit) produces a
    /// malformed response, so callers commit first.
    pub fn body(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
