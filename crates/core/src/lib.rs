//! Domain types shared by the storage and API crates.

pub mod clock;
pub mod device;
pub mod error;
pub mod roles;
pub mod types;
