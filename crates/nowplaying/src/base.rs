//! Heuristic derivation of a station's metadata base URL.
//!
//! Streaming servers conventionally co-locate their status endpoints either
//! at the server root or under the same mount-point prefix as the audio
//! stream. There is no ground truth here; the deriver is explicitly
//! best-effort and the resolver treats its output as one candidate among
//! several.

use url::Url;

/// Derive the candidate base URL believed to host a stream's metadata
/// endpoints.
///
/// Rules, in order:
/// - Unparseable input falls back to [`strip_query`].
/// - An empty path, `/`, or the Shoutcast placeholder `/;` maps to the
///   origin (`scheme://host[:port]`).
/// - Path segments are split, ignoring empty segments and literal `;`
///   segments. A first segment containing `stream` (case-insensitive) maps
///   to the origin — names like `/livestream` or `/stream128` are the audio
///   endpoint itself, not a mount prefix.
/// - More than one remaining segment maps to `origin/firstSegment`, treating
///   the first segment as a mount point housing the metadata siblings.
/// - Anything else maps to the origin.
pub fn derive_base(stream_url: &str) -> String {
    let parsed = match Url::parse(stream_url) {
        Ok(u) => u,
        Err(_) => return strip_query(stream_url),
    };

    let origin = origin_of(&parsed);

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty() && *seg != ";").collect())
        .unwrap_or_default();

    match segments.first() {
        None => origin,
        Some(first) if first.to_lowercase().contains("stream") => origin,
        Some(first) if segments.len() > 1 => format!("{}/{}", origin, first),
        Some(_) => origin,
    }
}

/// Strip the query string and a single trailing slash from a raw URL.
///
/// Used both as the parse-failure fallback of [`derive_base`] and to build
/// the secondary probe candidate (the stream URL itself, minus query).
pub fn strip_query(stream_url: &str) -> String {
    let without_query = match stream_url.find('?') {
        Some(idx) => &stream_url[..idx],
        None => stream_url,
    };
    without_query.strip_suffix('/').unwrap_or(without_query).to_string()
}

fn origin_of(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{}", port));
    }
    origin
}
