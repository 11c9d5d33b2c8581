//! Change notifications for the tailed file.
//!
//! [`ChangeSource`] is the subscribe half, [`WatchHandle::next`] the
//! next-event half. [`NotifySource`] is backed by the notify crate;
//! [`ManualSource`] hands control of event delivery to the caller.

use crate::error::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::any::Any;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Pending events per source. A queued write already causes a drain up to
/// end of file, so writes arriving behind it add nothing and are dropped.
const EVENT_BUFFER: usize = 1;

/// A change reported for the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Content may have changed. Says nothing about how many bytes.
    Write,
    /// Anything else (metadata, access, rename...).
    Other,
}

/// What [`WatchHandle::next`] yields.
#[derive(Debug)]
pub enum WatchEvent {
    Change(FileChange),
    Error(notify::Error),
    /// One of the event sources has shut down.
    Closed,
}

/// Something that can start watching a single file.
pub trait ChangeSource {
    fn subscribe(&self, path: &Path) -> Result<WatchHandle>;
}

/// An active subscription. Dropping it ends the subscription.
pub struct WatchHandle {
    changes: mpsc::Receiver<FileChange>,
    errors: mpsc::Receiver<notify::Error>,
    _subscription: Option<Box<dyn Any + Send>>,
}

impl WatchHandle {
    fn new(
        changes: mpsc::Receiver<FileChange>,
        errors: mpsc::Receiver<notify::Error>,
        subscription: Option<Box<dyn Any + Send>>,
    ) -> Self {
        Self {
            changes,
            errors,
            _subscription: subscription,
        }
    }

    /// Waits for whichever of the change and error sources fires first.
    pub async fn next(&mut self) -> WatchEvent {
        tokio::select! {
            change = self.changes.recv() => match change {
                Some(change) => WatchEvent::Change(change),
                None => WatchEvent::Closed,
            },
            error = self.errors.recv() => match error {
                Some(error) => WatchEvent::Error(error),
                None => WatchEvent::Closed,
            },
        }
    }
}

/// Watches files with the platform's native notification mechanism.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySource;

impl ChangeSource for NotifySource {
    fn subscribe(&self, path: &Path) -> Result<WatchHandle> {
        let (change_tx, change_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(EVENT_BUFFER);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                // Other changes are ignored downstream; queueing them could
                // crowd out a write.
                Ok(event) => {
                    if classify(&event) == FileChange::Write {
                        offer(&change_tx, FileChange::Write);
                    }
                }
                Err(error) => {
                    offer(&error_tx, error);
                }
            },
            Config::default(),
        )?;

        // The file itself, not its directory: only this path's events matter.
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        Ok(WatchHandle::new(change_rx, error_rx, Some(Box::new(watcher))))
    }
}

/// Queues `value` unless the buffer is full. False once the receiver is gone.
fn offer<T>(tx: &mpsc::Sender<T>, value: T) -> bool {
    !matches!(tx.try_send(value), Err(TrySendError::Closed(_)))
}

/// Maps a notify event onto the only distinction the tail cares about.
pub(crate) fn classify(event: &Event) -> FileChange {
    match event.kind {
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => FileChange::Write,
        _ => FileChange::Other,
    }
}

/// A source whose events are injected by hand through an [`EventInjector`].
///
/// It yields a single subscription; later calls to `subscribe` fail the
/// same way a broken OS watcher would.
pub struct ManualSource {
    pending: Mutex<Option<WatchHandle>>,
    failure: Option<String>,
}

impl ManualSource {
    pub fn new() -> (Self, EventInjector) {
        let (change_tx, change_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(EVENT_BUFFER);

        let source = Self {
            pending: Mutex::new(Some(WatchHandle::new(change_rx, error_rx, None))),
            failure: None,
        };
        let injector = EventInjector {
            changes: change_tx,
            errors: error_tx,
        };
        (source, injector)
    }

    /// A source whose every subscription fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            pending: Mutex::new(None),
            failure: Some(message.into()),
        }
    }
}

impl ChangeSource for ManualSource {
    fn subscribe(&self, _path: &Path) -> Result<WatchHandle> {
        if let Some(message) = &self.failure {
            return Err(notify::Error::generic(message).into());
        }
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending
            .take()
            .ok_or_else(|| notify::Error::generic("source already subscribed").into())
    }
}

/// The sending side of a [`ManualSource`]. Dropping it closes both sources.
///
/// Events go through the same bounded buffer as [`NotifySource`], so an event
/// sent while one is still queued is dropped.
pub struct EventInjector {
    changes: mpsc::Sender<FileChange>,
    errors: mpsc::Sender<notify::Error>,
}

impl EventInjector {
    /// Delivers a write event. Returns false once the handle is gone.
    pub fn write(&self) -> bool {
        offer(&self.changes, FileChange::Write)
    }

    pub fn other(&self) -> bool {
        offer(&self.changes, FileChange::Other)
    }

    pub fn error(&self, message: &str) -> bool {
        offer(&self.errors, notify::Error::generic(message))
    }

    /// True once the [`WatchHandle`] has been dropped.
    pub fn is_released(&self) -> bool {
        self.changes.is_closed() && self.errors.is_closed()
    }
}
