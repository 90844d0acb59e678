//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod post;
pub mod listener;

pub use user::User;
pub use message::Message;
pub use post::{Attachment, BotPost};
pub use listener::{Action, Listener};
