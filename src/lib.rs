pub mod application;
pub mod bot;
pub mod config;
pub mod storage;
