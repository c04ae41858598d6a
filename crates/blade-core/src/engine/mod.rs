pub mod runner;

pub use runner::{CreateRequest, Runner, StatusQuery};
