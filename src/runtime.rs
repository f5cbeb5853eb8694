//! Runtime for routing messages into conversations
//!
//! The dispatcher owns the conversation registry and talks to the outside
//! world only through the traits in [`traits`].

mod dispatcher;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use dispatcher::Dispatcher;
pub use traits::*;
