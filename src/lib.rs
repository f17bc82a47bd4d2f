pub mod apis;
pub mod assemble;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod matching;
pub mod parser;
pub mod pipeline;
pub mod scores;
pub mod storage;
pub mod types;

// Layered boundaries: ports describe outbound I/O, infra implements them
pub mod app;
pub mod infra;
