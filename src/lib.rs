//! PLC Copilot - Context-centric workflow engine for PLC programming
//!
//! Guides an automation engineer from requirements gathering to IEC 61131-3
//! Structured Text, one stateless interaction at a time. Each interaction
//! takes the caller's project context and returns the updated context, the
//! assistant's message and the next workflow stage.

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;
