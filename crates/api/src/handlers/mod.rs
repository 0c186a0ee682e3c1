//! Request handlers, grouped by surface area.

pub mod generate;
pub mod history;
pub mod models;
pub mod upload;
