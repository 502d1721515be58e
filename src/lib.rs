pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod program;
pub mod schemas;
pub mod server;
pub mod service;
pub mod signatures;
pub mod solver;
pub mod tools;
