//! tests/mod.rs
mod support;

mod cost_tests;
mod signature_tests;
mod zone_tests;
