pub mod backend_client;
pub mod errors;
pub mod export;
pub mod highlight;
pub mod inflight;
pub mod matcher;
pub mod models;
pub mod results_view;
pub mod service;
pub mod settings_store;
pub mod upload;
