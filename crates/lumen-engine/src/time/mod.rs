//! Render clock.
//!
//! Animation time is driven by stream timestamps, never by wall-clock time,
//! so a given (scene, timestamp) pair always renders the same pixels.

mod clock_time;

pub use clock_time::ClockTime;
