//! Pure resolution of a phase: each function reads a state and returns the
//! events that close it, leaving the commit to the caller.

pub mod day;
pub mod night;

pub use day::{resolve_day, tally, vote_leader};
pub use night::resolve_night;
