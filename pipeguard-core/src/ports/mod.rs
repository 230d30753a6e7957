// pipeguard-core/src/ports/mod.rs

pub mod notifier;

pub use notifier::{AlertNotifier, DeliveryError};
