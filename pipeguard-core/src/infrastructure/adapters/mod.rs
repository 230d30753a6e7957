// pipeguard-core/src/infrastructure/adapters/mod.rs

pub mod batch_reader;
pub mod webhook;

pub use batch_reader::load_batch;
pub use webhook::WebhookNotifier;
