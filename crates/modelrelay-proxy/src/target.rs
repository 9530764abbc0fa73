//! Upstream URL composition.

use axum::http::Uri;
use url::{Position, Url};

/// Join the upstream base with the inbound path and query.
///
/// The paths are joined with exactly one slash. Queries are concatenated
/// with `&` when both sides have one.
pub fn upstream_url(base: &Url, inbound: &Uri) -> Url {
    let mut target = base.clone();
    target.set_path(&single_joining_slash(base.path(), inbound.path()));

    let query = join_query(base.query().unwrap_or(""), inbound.query().unwrap_or(""));
    target.set_query((!query.is_empty()).then_some(query.as_str()));
    target
}

/// The `host[:port]` part of the upstream URL, as used for `Host`.
pub fn upstream_authority(base: &Url) -> &str {
    &base[Position::BeforeHost..Position::AfterPort]
}

fn single_joining_slash(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{a}{}", &b[1..]),
        (false, false) => format!("{a}/{b}"),
        _ => format!("{a}{b}"),
    }
}

fn join_query(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a}&{b}"),
    }
}
