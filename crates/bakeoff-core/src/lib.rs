pub mod catalog;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod providers;
pub mod report;
pub mod retry;
pub mod stats;
pub mod storage;
