#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// The ultimate strictness: catches things like missing documentation or overflow risks
#![warn(clippy::restriction)]

//! A repeating desktop alarm and countdown timer for the command line.
//!
//! An alarm is armed from a timeout expression, counts down with a
//! periodic status line, then plays a sound and shows a notification
//! until the user acknowledges it by clicking the notification.

pub mod core;

pub mod app;
pub use app::run;
