pub mod config;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod sound;
pub mod timeout;
