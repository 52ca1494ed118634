pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod render;
pub mod tools;
