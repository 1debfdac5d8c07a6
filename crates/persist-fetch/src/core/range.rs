//! Byte-range resume: building requests and checking what came back.

use crate::error::{FetchError, Result};

/// `Range` header value asking for everything from `offset` on.
pub fn range_header(offset: u64) -> String { format!("bytes={offset}-") }

/// A parsed `Content-Range: bytes <start>-<end>/<complete>` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start:           u64,
    pub end:             u64,
    /// `None` when the server answered `*`.
    pub complete_length: Option<u64>,
}

impl ContentRange {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| FetchError::InvalidContentRange(format!("{reason}: {value:?}"));

        let (unit, rest) = value.trim().split_once(' ').ok_or_else(|| invalid("missing unit"))?;
        if !unit.eq_ignore_ascii_case("bytes") {
            return Err(invalid("unknown unit"));
        }
        let (range, complete) = rest.trim().split_once('/').ok_or_else(|| invalid("missing length"))?;
        let (start, end) = range.split_once('-').ok_or_else(|| invalid("invalid range"))?;

        let parse = |s: &str| s.trim().parse::<u64>().map_err(|_| invalid("failed to parse int"));
        let start = parse(start)?;
        let end = parse(end)?;
        if end < start {
            return Err(invalid("range ends before it starts"));
        }
        let complete_length = match complete.trim() {
            "*" => None,
            n => Some(parse(n)?),
        };

        Ok(Self {
            start,
            end,
            complete_length,
        })
    }
}

/// Where a response body sits in the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Leading body bytes already on disk, to be discarded.
    pub skip:  u64,
    /// Size of the whole resource implied by the response.
    pub total: u64,
}

/// The parts of a response head that matter for resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead<'a> {
    pub status:         u16,
    pub content_length: Option<u64>,
    pub content_range:  Option<&'a str>,
}

/// Check a successful response against the offset that was requested and the
/// size recorded for the session.
///
/// A `206` must start at or before `requested`; its total comes from the
/// `Content-Range` complete length, or else from `start + Content-Length`.
/// Any other 2xx is taken as the whole resource starting at byte zero, so the
/// first `requested` bytes are skipped. A total that disagrees with
/// `expected` is a [`FetchError::SizeMismatch`].
pub fn reconcile(
    url: &str,
    requested: u64,
    expected: Option<u64>,
    head: ResponseHead<'_>,
) -> Result<Placement> {
    let (start, total) = if head.status == 206 {
        let value = head.content_range.ok_or_else(|| {
            FetchError::InvalidContentRange("partial content without Content-Range".into())
        })?;
        let range = ContentRange::parse(value)?;
        let total = match (range.complete_length, head.content_length) {
            (Some(complete), _) => Some(complete),
            (None, Some(remaining)) => range.start.checked_add(remaining),
            (None, None) => range.end.checked_add(1),
        }
        .ok_or_else(|| FetchError::InvalidContentRange(format!("length overflows: {value:?}")))?;
        (range.start, total)
    } else {
        let total = head
            .content_length
            .ok_or_else(|| FetchError::MissingContentLength { url: url.to_string() })?;
        (0, total)
    };

    if start > requested {
        return Err(FetchError::RangeGap { requested, start });
    }
    if let Some(expected) = expected
        && expected != total
    {
        return Err(FetchError::SizeMismatch {
            expected,
            actual: total,
        });
    }

    Ok(Placement {
        skip: requested - start,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/file.iso";

    fn head(status: u16, content_length: Option<u64>, content_range: Option<&str>) -> ResponseHead<'_> {
        ResponseHead {
            status,
            content_length,
            content_range,
        }
    }

    #[test]
    fn test_range_header() {
        assert_eq!(range_header(0), "bytes=0-");
        assert_eq!(range_header(400_000), "bytes=400000-");
    }

    #[test]
    fn test_parse_content_range() {
        let range = ContentRange::parse("bytes 100-999/1000").unwrap();
        assert_eq!(
            range,
            ContentRange {
                start: 100,
                end: 999,
                complete_length: Some(1000)
            }
        );

        let range = ContentRange::parse("bytes 0-9/*").unwrap();
        assert_eq!(range.complete_length, None);
    }

    #[test]
    fn test_parse_content_range_rejects_garbage() {
        for value in ["", "bytes", "items 0-9/10", "bytes 9-0/10", "bytes x-9/10", "bytes 0-9"] {
            assert!(
                matches!(ContentRange::parse(value), Err(FetchError::InvalidContentRange(_))),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn test_first_response_sets_total() {
        let placement = reconcile(URL, 0, None, head(200, Some(1_000), None)).unwrap();
        assert_eq!(placement, Placement { skip: 0, total: 1_000 });
    }

    #[test]
    fn test_first_response_without_length_fails() {
        let err = reconcile(URL, 0, None, head(200, None, None)).unwrap_err();
        assert!(matches!(err, FetchError::MissingContentLength { .. }));
    }

    #[test]
    fn test_resume_with_matching_range() {
        let placement = reconcile(
            URL,
            400,
            Some(1_000),
            head(206, Some(600), Some("bytes 400-999/1000")),
        )
        .unwrap();
        assert_eq!(placement, Placement { skip: 0, total: 1_000 });
    }

    #[test]
    fn test_resume_with_unknown_complete_length_uses_remaining_size() {
        let placement = reconcile(URL, 400, Some(1_000), head(206, Some(600), Some("bytes 400-999/*"))).unwrap();
        assert_eq!(placement.total, 1_000);

        let err = reconcile(URL, 400, Some(1_000), head(206, Some(700), Some("bytes 400-1099/*"))).unwrap_err();
        assert!(matches!(err, FetchError::SizeMismatch { expected: 1_000, actual: 1_100 }));
    }

    #[test]
    fn test_resume_with_changed_total_fails() {
        let err = reconcile(
            URL,
            400,
            Some(1_000),
            head(206, Some(800), Some("bytes 400-1199/1200")),
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::SizeMismatch { expected: 1_000, actual: 1_200 }));
    }

    #[test]
    fn test_resume_starting_early_skips_overlap() {
        let placement = reconcile(
            URL,
            400,
            Some(1_000),
            head(206, Some(700), Some("bytes 300-999/1000")),
        )
        .unwrap();
        assert_eq!(placement, Placement { skip: 100, total: 1_000 });
    }

    #[test]
    fn test_resume_starting_late_is_a_gap() {
        let err = reconcile(
            URL,
            400,
            Some(1_000),
            head(206, Some(500), Some("bytes 500-999/1000")),
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::RangeGap { requested: 400, start: 500 }));
    }

    #[test]
    fn test_server_ignoring_range_restarts_from_zero() {
        let placement = reconcile(URL, 400, Some(1_000), head(200, Some(1_000), None)).unwrap();
        assert_eq!(placement, Placement { skip: 400, total: 1_000 });

        let err = reconcile(URL, 400, Some(1_000), head(200, Some(900), None)).unwrap_err();
        assert!(matches!(err, FetchError::SizeMismatch { .. }));
    }

    #[test]
    fn test_overflowing_length_is_rejected() {
        let err = reconcile(URL, 0, None, head(206, None, Some("bytes 0-18446744073709551615/*"))).unwrap_err();
        assert!(matches!(err, FetchError::InvalidContentRange(_)));

        let err = reconcile(
            URL,
            0,
            None,
            head(206, Some(u64::MAX), Some("bytes 10-19/*")),
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidContentRange(_)));
    }

    #[test]
    fn test_partial_content_without_header_fails() {
        let err = reconcile(URL, 400, Some(1_000), head(206, Some(600), None)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidContentRange(_)));
    }
}
