//! The tail engine: open, commit, initial drain, then drain on every write.

use crate::error::{Error, Result};
use crate::path::TailRequest;
use crate::response::{CgiResponse, ResponseHead, StreamOutcome};
use crate::watcher::{ChangeSource, FileChange, WatchEvent, WatchHandle};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a committed stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    WatcherError,
    WatcherClosed,
    DrainFailed,
    CommitFailed,
}

/// An open file and how far into it the stream has read.
///
/// The offset lives in the handle; `offset` mirrors it for logging.
pub struct FileCursor {
    file: File,
    offset: u64,
}

impl FileCursor {
    fn new(file: File) -> Self {
        Self { file, offset: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Copies everything between the current offset and end of file into
    /// `out`. Zero bytes is a normal result.
    ///
    /// A truncated file is not detected: reads past its new end return
    /// nothing until it grows past the old offset again.
    pub async fn drain<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> io::Result<u64> {
        let copied = tokio::io::copy(&mut self.file, out).await?;
        out.flush().await?;
        self.offset += copied;
        Ok(copied)
    }
}

/// Serves tails of files under one directory.
pub struct Tail<S> {
    root: PathBuf,
    source: S,
}

impl<S: ChangeSource> Tail<S> {
    pub fn new<P: AsRef<Path>>(root: P, source: S) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            source,
        }
    }

    /// Opens the file and subscribes to its changes. Nothing has been written
    /// yet, so any error here can still become a status code.
    pub async fn open(&self, request: &TailRequest) -> Result<OpenTail> {
        let name = request.name().to_string();
        let path = self.root.join(&name);

        let file = File::open(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::FileNotFound { path: name.clone() }
            } else {
                Error::Open {
                    path: name.clone(),
                    source,
                }
            }
        })?;

        let metadata = file.metadata().await.map_err(|source| Error::Open {
            path: name.clone(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(Error::NotAFile { path: name });
        }

        // On failure `file` is dropped here, before the error reaches the caller.
        let watch = self.source.subscribe(&path)?;

        Ok(OpenTail {
            name,
            cursor: FileCursor::new(file),
            watch,
        })
    }

    /// Runs one whole invocation against `response`.
    ///
    /// Errors before the commit point are written as an error response and
    /// returned. Once the 200 head is out the outcome is `Ok` whatever happens
    /// to the stream afterwards.
    pub async fn run<W: AsyncWrite + Unpin>(
        &self,
        request: &TailRequest,
        response: &mut CgiResponse<W>,
        cancel: &CancellationToken,
    ) -> StreamOutcome {
        let tail = match self.open(request).await {
            Ok(tail) => tail,
            Err(error) => return response.reject(error).await,
        };

        tail.stream(response, cancel).await;
        StreamOutcome::Ok
    }
}

/// A file that is open and watched, ready to be streamed.
pub struct OpenTail {
    name: String,
    cursor: FileCursor,
    watch: WatchHandle,
}

impl OpenTail {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commits a 200 head, sends the current content, then follows appends
    /// until the output closes, the watcher fails or `cancel` fires.
    ///
    /// Consumes the tail so the file and the watch are released on return.
    pub async fn stream<W: AsyncWrite + Unpin>(
        mut self,
        response: &mut CgiResponse<W>,
        cancel: &CancellationToken,
    ) -> StopReason {
        let reason = self.follow(response, cancel).await;
        info!(
            file = %self.name,
            offset = self.cursor.offset(),
            ?reason,
            "tail stopped"
        );
        reason
    }

    async fn follow<W: AsyncWrite + Unpin>(
        &mut self,
        response: &mut CgiResponse<W>,
        cancel: &CancellationToken,
    ) -> StopReason {
        if let Err(error) = response
            .commit(&ResponseHead::for_outcome(&StreamOutcome::Ok))
            .await
        {
            warn!(file = %self.name, %error, "failed to commit response");
            return StopReason::CommitFailed;
        }

        if !self.drain(response.body()).await {
            return StopReason::DrainFailed;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return StopReason::Cancelled,
                event = self.watch.next() => match event {
                    WatchEvent::Change(FileChange::Write) => {
                        if !self.drain(response.body()).await {
                            return StopReason::DrainFailed;
                        }
                    }
                    WatchEvent::Change(FileChange::Other) => {}
                    WatchEvent::Error(error) => {
                        warn!(file = %self.name, %error, "watcher failed");
                        return StopReason::WatcherError;
                    }
                    WatchEvent::Closed => return StopReason::WatcherClosed,
                },
            }
        }
    }

    async fn drain<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> bool {
        match self.cursor.drain(out).await {
            Ok(bytes) => {
                debug!(file = %self.name, bytes, offset = self.cursor.offset(), "drained");
                true
            }
            Err(error) => {
                warn!(file = %self.name, %error, "drain failed");
                false
            }
        }
    }
}
