//! Shiftdesk CLI library exports.

pub mod args;
pub mod config;
pub mod error;
pub mod logging;
pub mod run;
