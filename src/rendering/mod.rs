//! GPU rendering for the cloner.

pub mod cloner;

pub use cloner::{draw_args, ClonerError, ClonerRenderer};
