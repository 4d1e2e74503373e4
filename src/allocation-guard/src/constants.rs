//! Fixed protocol constants. Anything tunable lives in [`crate::config`].

/// Current submission envelope version.
pub const ENVELOPE_VERSION: u16 = 1;

/// r || s || v
pub const SIGNATURE_LEN: usize = 65;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Length of the rolling spending window.
pub const DAILY_WINDOW_SECS: u64 = 24 * 60 * 60;
