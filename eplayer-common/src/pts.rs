//! Presentation timestamp helpers
//!
//! PTS values are carried as `i64` ticks of the 90 kHz MPEG system clock.
//! A PES header only has room for 33 bits, so values are masked when they
//! are serialised. [`INVALID_PTS_VALUE`] marks "no timestamp"; it lies just
//! outside the 33-bit range.
//!
//! # Examples
//!
//! ```
//! use eplayer_common::pts::{rescale, seconds_to_pts, PTS_CLOCK_HZ};
//!
//! assert_eq!(seconds_to_pts(2.0), 2 * PTS_CLOCK_HZ);
//! // 1 second in a 1/48000 time base expressed in 90 kHz ticks
//! assert_eq!(rescale(48_000, PTS_CLOCK_HZ, 48_000), 90_000);
//! ```

/// MPEG system clock frequency used by PES timestamps
pub const PTS_CLOCK_HZ: i64 = 90_000;

/// Sentinel for "no timestamp available"
pub const INVALID_PTS_VALUE: i64 = 0x2_0000_0000;

/// Mask of the 33 bits a PES PTS field can hold
pub const PTS_MASK: i64 = 0x1_FFFF_FFFF;

/// Returns `true` unless `pts` is the [`INVALID_PTS_VALUE`] sentinel.
pub fn is_valid(pts: i64) -> bool {
    pts != INVALID_PTS_VALUE
}

/// Compute `a * b / c` rounding to nearest (halves away from zero).
///
/// Intermediate math is done in 128 bits so large timestamps do not
/// overflow. Returns [`INVALID_PTS_VALUE`] when `c` is zero.
pub fn rescale(a: i64, b: i64, c: i64) -> i64 {
    if c == 0 {
        return INVALID_PTS_VALUE;
    }

    let num = a as i128 * b as i128;
    let den = c as i128;
    let half = den.abs() / 2;

    let magnitude = (num.abs() + half) / den.abs();
    let rounded = if (num < 0) != (den < 0) {
        -magnitude
    } else {
        magnitude
    };

    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Convert seconds to 90 kHz ticks (truncating)
pub fn seconds_to_pts(seconds: f64) -> i64 {
    (seconds * PTS_CLOCK_HZ as f64) as i64
}

/// Convert 90 kHz ticks to seconds
pub fn pts_to_seconds(pts: i64) -> f64 {
    pts as f64 / PTS_CLOCK_HZ as f64
}
