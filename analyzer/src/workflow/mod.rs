pub mod config;
pub mod dopset;
pub mod operator;
pub mod runner;
