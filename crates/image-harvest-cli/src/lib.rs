//! Image Harvest CLI — acquire image datasets and run transformation chains from the shell.

pub mod commands;
pub mod display;
pub mod input;

pub use commands::Context;
pub use input::{load_params, parse_steps};
