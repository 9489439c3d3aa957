//! Line-oriented, IRC-framed transport around the chat engine.

pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod formatter;
pub mod listener;
pub mod numerics;
pub mod parser;
pub mod session;
