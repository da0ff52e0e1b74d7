// Library root: re-exports all modules so integration tests and the CLI can
// access the crate's public API.

pub mod config;
pub mod dvp;
pub mod pipeline;
pub mod positions;
pub mod records;
pub mod severity;
