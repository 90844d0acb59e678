//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Credentials and settings loading
//! - Storage: Brain persistence (memory, JSON file, sqlite)
//! - Adapters: Platform integrations (GroupMe, console)

pub mod config;
pub mod database;
pub mod storage;
pub mod adapters;
