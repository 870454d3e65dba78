//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod call_model;
pub mod lenient;
pub mod notification_model;
pub mod tenant_model;
pub mod webhook_model;
