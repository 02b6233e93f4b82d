//! Domain models
//!
//! This module contains the entities the judge reads and writes.

pub mod contest;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod user;

pub use contest::*;
pub use problem::*;
pub use submission::*;
pub use test_case::*;
pub use user::*;
