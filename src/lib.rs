pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod locks;
pub mod metrics;
pub mod pipeline;
pub mod replay;
pub mod store;
