//! snapclass demo
//!
//! Terminal stand-in for the UI: model selection and image selection arrive
//! as text commands, notifications are printed as they are published.

pub mod cli;
pub mod config;
pub mod session;
