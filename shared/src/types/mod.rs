//! Core data model

pub mod call;
pub mod descriptor;
pub mod record;
