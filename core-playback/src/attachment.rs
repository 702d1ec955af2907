//! URL glue between attachment metadata and the media store.

use bridge_traits::Attachment;

/// Absolute remote URL of an attachment.
///
/// URLs starting with `http` are used as-is; anything else is treated as a
/// server-relative path and joined to `base_url`. Returns `None` when the
/// attachment has no URL, or has a relative one and no base is known.
pub fn resolve_remote_url(base_url: Option<&str>, attachment: &Attachment) -> Option<String> {
    let url = attachment.remote_url.as_deref()?.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http") {
        return Some(url.to_string());
    }

    let base = base_url?.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    if url.starts_with('/') {
        Some(format!("{}{}", base, url))
    } else {
        Some(format!("{}/{}", base, url))
    }
}
