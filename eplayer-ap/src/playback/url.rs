//! Stream URL classification

use crate::error::{Error, Result};

/// A URL the input can open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUrl {
    pub url: String,
    /// HTTP-like transport; trick play is limited on these
    pub is_http: bool,
}

impl StreamUrl {
    /// Classify a user-supplied location.
    ///
    /// - `/path` becomes `file:///path`
    /// - `mms://...` becomes `mmst://...` and is marked HTTP-like
    /// - anything containing `://` passes through
    /// - everything else is rejected
    pub fn classify(raw: &str) -> Result<Self> {
        if raw.starts_with('/') {
            return Ok(Self {
                url: format!("file://{}", raw),
                is_http: false,
            });
        }
        if let Some(rest) = raw.strip_prefix("mms") {
            if rest.starts_with("://") {
                return Ok(Self {
                    url: format!("mmst{}", rest),
                    is_http: true,
                });
            }
        }
        if raw.contains("://") {
            return Ok(Self {
                url: raw.to_string(),
                is_http: false,
            });
        }
        Err(Error::InvalidCall(format!("Unknown stream ({})", raw)))
    }
}
