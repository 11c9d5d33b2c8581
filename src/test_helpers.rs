//! Test utilities for creating a temporary serving directory with files to tail.

use crate::config::DEFAULT_LOG_FILTER;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

pub struct TempTailDir {
    _temp_dir: tempfile::TempDir,
    root: PathBuf,
}

impl TempTailDir {
    /// Create an empty serving directory
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let root = temp_dir.path().to_path_buf();
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    /// Create a serving directory holding one file with initial content
    pub fn with_file(name: &str, content: &str) -> std::io::Result<Self> {
        let dir = Self::new()?;
        fs::write(dir.file_path(name), content)?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Append raw content to a file, without adding a newline
    pub fn append(&self, name: &str, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(self.file_path(name))?;
        file.write_all(content.as_bytes())?;
        file.flush()
    }

    /// Truncate a file and write new content (simulate log rotation)
    pub fn rewrite(&self, name: &str, content: &str) -> std::io::Result<()> {
        fs::write(self.file_path(name), content)
    }
}

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collects this thread's log events, filtered the way the binary filters by
/// default, until the guard is dropped.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_file_creates_content() {
        let dir = TempTailDir::with_file("app.log", "first\n").unwrap();
        let content = fs::read_to_string(dir.file_path("app.log")).unwrap();
        assert_eq!(content, "first\n");
    }

    #[test]
    fn test_append_does_not_add_newline() {
        let dir = TempTailDir::with_file("app.log", "abc").unwrap();
        dir.append("app.log", "def").unwrap();

        let content = fs::read_to_string(dir.file_path("app.log")).unwrap();
        assert_eq!(content, "abcdef");
    }

    #[test]
    fn test_capture_logs_applies_default_filter() {
        let (logs, _guard) = capture_logs();
        tracing::info!("quiet");
        tracing::warn!("loud");

        let contents = logs.contents();
        assert!(!contents.contains("quiet"));
        assert!(contents.contains("WARN"));
        assert!(contents.contains("loud"));
    }

    #[test]
    fn test_rewrite_truncates() {
        let dir = TempTailDir::with_file("app.log", "initial content").unwrap();
        dir.rewrite("app.log", "x").unwrap();

        let content = fs::read_to_string(dir.file_path("app.log")).unwrap();
        assert_eq!(content, "x");
    }
}
