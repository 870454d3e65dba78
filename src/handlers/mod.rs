//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers HTTP.
pub mod webhook_handler;

