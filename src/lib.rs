pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod model;
pub mod seed;
pub mod server;
pub mod storage;
pub mod web;
