//! Bounded circular buffers for byte and element streams.
//!
//! [`circular_buffer::CircularBuffer`] is a fixed-capacity FIFO with
//! overwrite-oldest semantics, built on the overflow-safe cursor arithmetic
//! in [`integer_math`]. The remaining modules expose named byte channels
//! over D-Bus for the `ringbufd` daemon.

pub mod channel;
pub mod circular_buffer;
pub mod config;
pub mod error;
pub mod integer_math;
pub mod sources;

pub use circular_buffer::CircularBuffer;
pub use error::Error;
