pub mod config;
pub mod logging;
pub mod input;
pub mod tools;
pub mod bot;
