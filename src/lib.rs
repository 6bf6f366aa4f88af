pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod list;
pub mod logging;
pub mod notify;
pub mod session;
