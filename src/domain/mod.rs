//! Domain layer - Core business logic with no external dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (User, Message, BotPost, Listener)
//! - Traits: Abstractions for infrastructure (Bot, Store, UserDirectory)

pub mod entities;
pub mod traits;
