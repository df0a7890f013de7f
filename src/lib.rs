pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod navigation;
pub mod router;
pub mod views;
