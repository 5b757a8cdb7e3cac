//! classkit core: configuration, error taxonomy and roster file handling.

pub mod config;
pub mod error;
pub mod roster;
