pub mod config;
pub mod error;
pub mod payroll;
pub mod telemetry;
