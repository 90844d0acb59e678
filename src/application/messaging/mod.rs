//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod parser;
pub mod router;

pub use dispatcher::MessageDispatcher;
pub use parser::MessageParser;
pub use router::{Router, RouteMatch};
