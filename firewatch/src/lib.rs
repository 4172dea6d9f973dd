pub mod alerts;
pub mod config;
pub mod db;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod push;
pub mod rest;
pub mod retention;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod validate;
pub mod ws;

pub use rest::create_router;
pub use state::AppState;
