pub mod config;
pub mod controller;
pub mod error;
pub mod service;
pub mod storage;
pub mod types;
