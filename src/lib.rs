pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod languages;
pub mod placeholder;
pub mod providers;
pub mod walker;
