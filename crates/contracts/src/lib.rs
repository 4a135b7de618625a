//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the fall monitor.
//! All business crates depend on this crate; reverse dependencies are prohibited.
//!
//! ## Coordinate model
//! - Image pixels, origin top-left, `y` grows downward
//! - "Up" in the scene is the unit vector `(0, -1)`

mod blueprint;
mod error;
mod pose;
mod report;
mod source_id;
mod track;

pub use blueprint::*;
pub use error::*;
pub use pose::*;
pub use report::*;
pub use source_id::SourceId;
pub use track::*;
