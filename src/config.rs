//! Settings and request data taken from the CGI environment.

use crate::error::{Error, Result};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::path::PathBuf;

/// Filter used when `TAILCGI_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// The parts of a CGI request the responder looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiRequest {
    pub method: String,
    pub protocol: String,
    /// Decoded request path, still carrying its leading `/`. Not yet validated.
    pub path: String,
}

impl CgiRequest {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(utf8_vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let invalid = |message: &str| Error::InvalidRequest {
            message: message.to_string(),
        };

        let method = vars
            .get("REQUEST_METHOD")
            .filter(|method| !method.is_empty())
            .ok_or_else(|| invalid("no REQUEST_METHOD in environment"))?
            .clone();

        let protocol = vars.get("SERVER_PROTOCOL").cloned().unwrap_or_default();
        if !is_http_version(&protocol) {
            return Err(invalid("invalid SERVER_PROTOCOL version"));
        }

        let path = match vars.get("PATH_INFO").filter(|path| !path.is_empty()) {
            Some(path) => path.clone(),
            None => match vars.get("REQUEST_URI") {
                Some(uri) => percent_decode_str(request_uri_path(uri))
                    .decode_utf8()
                    .map_err(|_| invalid("request path is not valid UTF-8"))?
                    .into_owned(),
                None => String::new(),
            },
        };

        Ok(Self {
            method,
            protocol,
            path,
        })
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory requested names are resolved against.
    pub root: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_vars(utf8_vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let value: String = value.into();
            if value.is_empty() {
                continue;
            }
            match key.into().as_str() {
                "TAILCGI_ROOT" => settings.root = PathBuf::from(value),
                "TAILCGI_LOG" => settings.log_filter = value,
                _ => {}
            }
        }
        settings
    }
}

fn utf8_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// `HTTP/<major>.<minor>`, as accepted by HTTP/1.x CGI gateways.
fn is_http_version(protocol: &str) -> bool {
    let Some(version) = protocol.strip_prefix("HTTP/") else {
        return false;
    };
    let Some((major, minor)) = version.split_once('.') else {
        return false;
    };
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    is_number(major) && is_number(minor)
}

fn request_uri_path(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or_default()
}
