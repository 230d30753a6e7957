// pipeguard-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contrats vers l'extérieur (AlertNotifier...)
pub mod ports;

// 2. Domain (Cœur du métier)
// Quality gate, run monitor, alert rules, health aggregation.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// Config files, CSV/JSON readers, webhook, atomic writes.
pub mod infrastructure;

// 4. Application (Use Cases)
// Orchestration (quality pipeline, alert dispatch, clean)
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::PipeguardError;
