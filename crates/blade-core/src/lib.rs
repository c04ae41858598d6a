pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod model;
pub mod storage;
pub mod transport;
pub mod uid;
