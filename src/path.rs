//! Validation of the requested file name.

use crate::error::{Error, Result};
use std::path::Path;

/// A validated request: one file name, relative to the serving directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailRequest {
    name: String,
}

impl TailRequest {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Turns the raw request path into a [`TailRequest`].
///
/// The path must start with `/` and what follows must be its own base name,
/// which rules out nested paths, parent references and absolute escapes.
pub fn validate(raw_path: &str) -> Result<TailRequest> {
    let invalid = || Error::InvalidPath {
        path: raw_path.to_string(),
    };

    let name = raw_path.strip_prefix('/').ok_or_else(invalid)?;
    if !is_single_component(name) {
        return Err(invalid());
    }

    Ok(TailRequest {
        name: name.to_string(),
    })
}

fn is_single_component(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains('\0') || name.contains(['/', '\\']) {
        return false;
    }
    Path::new(name).file_name().and_then(|base| base.to_str()) == Some(name)
}
