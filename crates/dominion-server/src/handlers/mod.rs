//! Request handlers.

pub mod account;
pub mod battle;

pub use account::{AccountHandler, RegistrationError, RegistrationRequest};
pub use battle::{BattleHandler, EngageError, EngageRequest};
