pub mod config;
pub mod diff;
pub mod sync;
pub mod update;
pub mod validate;
