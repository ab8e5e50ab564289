//! Subsystem modules for the movie bot.

pub mod comms;
pub mod recommend;
pub mod runtime;
