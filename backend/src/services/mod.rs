pub mod auth;
pub mod certificates;
pub mod data_sources;
pub mod generate;
pub mod templates;
