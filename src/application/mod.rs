//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Blacklist ownership and broadcast building
//! - Errors: Domain-specific errors
//! - Messaging: Console parsing, routing, dispatching

pub mod errors;
pub mod services;
pub mod messaging;
