pub mod app;
pub mod catalog;
pub mod config;
pub mod csv_table;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod normalize;
pub mod output;
pub mod store;
