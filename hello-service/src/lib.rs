pub mod cli;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub const SERVICE_NAME: &str = "hello-service";
