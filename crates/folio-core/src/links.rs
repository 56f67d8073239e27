//! Link validation for cover images, galleries and external URLs.

use url::Url;

use crate::error::ValidationError;

/// Path prefix under which uploaded files are served.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Accept an absolute `http`/`https` URL with a host, or a site-relative
/// path under [`UPLOADS_PREFIX`]. Returns the trimmed link.
pub fn validate_link(s: &str) -> Result<String, ValidationError> {
    let link = s.trim();
    let invalid = || ValidationError::InvalidLink(s.to_string());

    if let Some(rest) = link.strip_prefix(UPLOADS_PREFIX) {
        if rest.is_empty() || rest.contains("..") || rest.contains('\\') {
            return Err(invalid());
        }
        return Ok(link.to_string());
    }

    let url = Url::parse(link).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(link.to_string()),
        _ => Err(invalid()),
    }
}
