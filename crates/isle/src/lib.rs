pub mod config;
pub mod error;
pub mod geometry;
pub mod protocols;
pub mod shell;
pub mod state;
