//! Application services — use-case implementations.
//!
//! Each service struct accepts its collaborators via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod device_service;
