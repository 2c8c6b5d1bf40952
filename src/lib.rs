pub mod backup;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod errors;
pub mod models;
pub mod net;
pub mod seed;
pub mod session;
pub mod storage;
pub mod story;

pub use engine::*;
