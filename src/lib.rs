pub mod config;
pub mod driver;
pub mod report;
pub mod responder;
pub mod state;
pub mod telemetry;
