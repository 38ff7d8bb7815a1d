//! Configuration for the concept-shift server and CLI.

mod settings;

pub use settings::*;
