pub mod config;
pub mod extractor;
pub mod model;
pub mod normalizer;
pub mod server;
pub mod storage;
pub mod utils;
