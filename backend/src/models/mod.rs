//! Data models shared across database access and API handlers.

pub mod chat;
pub mod device;
pub mod link;
pub mod session;
pub mod user;
