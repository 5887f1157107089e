//! Pharmesol agent: inbound sales calls for pharmacies.

pub mod actions;
pub mod config;
pub mod conversation;
pub mod demo;
pub mod directory;
pub mod error;
pub mod llm;
pub mod templates;
