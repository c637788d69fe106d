//! URL algebra shared by every resource.
//!
//! Entities are addressed by a `base` path relative to the server root
//! (e.g. `/job/folder/job/app`). Everything else (API suffixes, parent
//! folders, workflow-API links, queue locations) is derived from it here.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static WFAPI_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+)/wfapi/.*$").expect("static regex is valid"));

/// Appends the JSON API suffix to an entity base.
///
/// `/job/app` becomes `/job/app/api/json`. An empty base addresses the server root.
pub fn api_json(base: &str) -> String {
    format!("{}/api/json", base.trim_end_matches('/'))
}

/// Joins a known sub-path onto a base without doubling slashes.
pub fn join(base: &str, suffix: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}

/// Builds the base of a (possibly nested) job from a slash-separated path.
///
/// # Examples
///
/// `"app"` gives `/job/app`, `"team/app"` gives `/job/team/job/app`.
/// Each segment is percent-encoded, so `"my app"` gives `/job/my%20app`.
pub fn job_base(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("/job/{}", urlencoding::encode(segment)))
        .collect()
}

/// Returns the base of the folder containing a job or folder.
///
/// Top-level items live directly under the server root, which is the empty base.
pub fn parent_base(base: &str) -> &str {
    let trimmed = base.trim_end_matches('/');
    match trimmed.rfind("/job/") {
        Some(index) => &trimmed[..index],
        None => "",
    }
}

/// Decoded name of the job or folder a base points at.
pub fn job_name(base: &str) -> Option<String> {
    let trimmed = base.trim_end_matches('/');
    let index = trimmed.rfind("/job/")?;
    let encoded = &trimmed[index + "/job/".len()..];
    if encoded.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(encoded)
        .map_or_else(|_| encoded.to_string(), |name| name.into_owned());
    Some(decoded)
}

/// Server-relative base of an item from the absolute `url` the server reports.
///
/// Only the path is kept; the server's configured root URL can differ from
/// the address this client reaches it at.
pub fn relative_base(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Derives the addressable base of a pipeline run or node from its
/// `_links.self.href`, stripping the `/wfapi/...` tail.
///
/// Returns `None` when the link does not point into the workflow API.
pub fn wfapi_base(href: &str) -> Option<&str> {
    WFAPI_LINK
        .captures(href)
        .and_then(|captures| captures.get(1))
        .map(|group| group.as_str())
}

/// Extracts the queue item ID from a `Location` header.
///
/// The server answers a build submission with the URL of the queue item it
/// created (`http://host/queue/item/42/`), not with a build URL; the last
/// non-empty path segment is the item ID.
pub fn queue_item_id(location: &str) -> Option<&str> {
    let path = match location.find("://") {
        Some(scheme_end) => {
            let after_scheme = &location[scheme_end + 3..];
            after_scheme.find('/').map_or("", |i| &after_scheme[i..])
        }
        None => location,
    };
    let path = path.split(['?', '#']).next().unwrap_or(path);

    path.rsplit('/').find(|segment| !segment.is_empty())
}

/// Resolves an entity path against the server root.
///
/// Absolute URLs (as found in `_links` and `url` fields) are used as given.
/// Server-relative paths that already carry the root's path prefix (Jenkins
/// mounted under `/jenkins`) are resolved against the origin so the prefix is
/// not applied twice.
pub fn resolve(server: &Url, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let root = server.as_str().trim_end_matches('/');
    let prefix = server.path().trim_end_matches('/');

    if !prefix.is_empty() && (path == prefix || path.starts_with(&format!("{prefix}/"))) {
        let origin = server.origin().ascii_serialization();
        return format!("{origin}{path}");
    }

    if path.is_empty() {
        root.to_string()
    } else if path.starts_with('/') {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}
