//! Kiln Core
//!
//! Foundational types shared by every Kiln crate:
//!
//! - [`StringHash`]: deterministic name hashing used for bone, node and track lookup
//! - [`errors`]: the engine-wide [`KilnError`] and [`Result`] alias
//! - [`time`]: the frame clock that drives per-frame updates

pub mod errors;
pub mod hash;
pub mod time;

pub use errors::{KilnError, Result};
pub use hash::StringHash;
pub use time::FrameClock;
