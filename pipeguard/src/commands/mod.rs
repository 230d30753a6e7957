// pipeguard/src/commands/mod.rs

pub mod alerts;
pub mod check;
pub mod clean;
pub mod health;
pub mod init;
