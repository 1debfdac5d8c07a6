//! Local file names for remote URLs.

use chrono::{DateTime, Local};
use percent_encoding::percent_decode_str;

const ILLEGAL: &[char] = &['/', '?', '<', '>', '\\', ':', '*', '|', '"'];
const MAX_LEN: usize = 128;

/// Pick a file name for `url`.
///
/// The last path segment is used, unless the URL carries a `filename=`
/// parameter, whose value wins. The result is percent-decoded and cut at the
/// first `&`. Names that are empty, too long or hold characters some file
/// systems reject fall back to a timestamped `untitled_download`.
pub fn file_name_for(url: &str, now: DateTime<Local>) -> String {
    let base = url.rsplit('/').next().unwrap_or_default();
    let encoded = match base.find("filename=") {
        Some(at) => &base[at + "filename=".len()..],
        None => base,
    };
    let decoded = percent_decode_str(encoded).decode_utf8_lossy();
    let name = decoded.split('&').next().unwrap_or_default();

    if is_legal(name) {
        name.to_string()
    } else {
        tracing::debug!(url, candidate = name, "no usable file name in URL");
        fallback(now)
    }
}

pub fn is_legal(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_LEN && !name.contains(ILLEGAL)
}

fn fallback(now: DateTime<Local>) -> String { now.format("untitled_download %m-%d_%H-%M").to_string() }
