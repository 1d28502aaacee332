//! HTTP byte-range resolution.
//!
//! Resolves a request's `Range` header against a known file size. The
//! renderer issues plain single ranges (`bytes=a-b`, `bytes=a-`,
//! `bytes=-n`); anything the parser does not understand is treated as no
//! range at all, which degrades to a full-body `200`.

/// Resolution of a `Range` header against a file of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole file with `200 OK`.
    Full,
    /// Serve `start..=end` with `206 Partial Content`.
    Partial { start: u64, end: u64 },
    /// The range cannot be satisfied; respond `416`.
    Unsatisfiable,
}

/// Resolve `header` (the raw `Range` value, if present) against `size`.
///
/// A range that covers exactly the whole file collapses to [`RangeOutcome::Full`],
/// so callers answer it with `200` rather than `206`.
pub fn resolve_range(header: Option<&str>, size: u64) -> RangeOutcome {
    let Some(spec) = header.and_then(|h| h.strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };

    let spec = spec.trim();
    let Some((raw_start, raw_end)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };

    let (start, end) = if raw_start.is_empty() {
        // Suffix form: the last N bytes.
        let Ok(suffix) = raw_end.parse::<u64>() else {
            return RangeOutcome::Full;
        };
        (size.saturating_sub(suffix), size.saturating_sub(1))
    } else {
        let Ok(start) = raw_start.parse::<u64>() else {
            return RangeOutcome::Full;
        };
        let end = if raw_end.is_empty() {
            size.saturating_sub(1)
        } else {
            match raw_end.parse::<u64>() {
                Ok(end) => end.min(size.saturating_sub(1)),
                Err(_) => return RangeOutcome::Full,
            }
        };
        (start, end)
    };

    if start > end || start >= size {
        return RangeOutcome::Unsatisfiable;
    }

    if start == 0 && end == size - 1 {
        return RangeOutcome::Full;
    }

    RangeOutcome::Partial { start, end }
}
