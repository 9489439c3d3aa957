//! Protocol-agnostic chat core: users, channels and the command processor.
//! Nothing in here performs I/O.

pub mod broadcast;
pub mod channel;
pub mod chat_engine;
pub mod command;
pub mod error;
pub mod users;
pub mod validation;

pub use broadcast::{Broadcast, Outcome, PayloadKind};
pub use chat_engine::ChatEngine;
pub use command::{Command, CommandKind, UserId};
pub use error::ServerError;
