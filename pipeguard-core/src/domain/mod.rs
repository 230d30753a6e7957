pub mod alerting;
pub mod batch;
pub mod error;
pub mod health;
pub mod monitor;
pub mod project;
pub mod quality;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
