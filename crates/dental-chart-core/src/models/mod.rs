//! Domain models for the dental chart system.

mod patient;
mod procedure;
mod tooth;

pub use patient::*;
pub use procedure::*;
pub use tooth::*;
