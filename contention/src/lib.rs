pub mod config;
mod errors;
pub mod jitter;
pub mod permit;
pub mod queue;
pub mod register;
pub mod scenario;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use errors::ContentionError;

pub type Result<T> = std::result::Result<T, ContentionError>;
