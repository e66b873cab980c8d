pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod provider;
pub mod sync;
pub mod types;
