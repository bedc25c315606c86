//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{format_age, normalize_player_name};
