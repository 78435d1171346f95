pub mod actions;
pub mod connection;
pub mod protocol;
