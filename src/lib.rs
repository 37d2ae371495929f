pub mod bands;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod outcomes;
pub mod scenario;
pub mod types;
pub mod variates;
