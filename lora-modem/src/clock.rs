//! Monotonic millisecond clock with wraparound-safe arithmetic.

/// A free-running millisecond tick counter.
///
/// The counter may wrap; compare ticks only through [`ticks_diff`].
pub trait Clock {
    /// Current tick count in milliseconds.
    fn now_ms(&self) -> u32;
}

impl<F: Fn() -> u32> Clock for F {
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Returns `ticks + delta_ms`, wrapping.
pub const fn ticks_add(ticks: u32, delta_ms: u32) -> u32 {
    ticks.wrapping_add(delta_ms)
}

/// Signed distance `a - b` in milliseconds.
///
/// Correct as long as the two instants are less than 2^31 ms apart.
pub const fn ticks_diff(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}
