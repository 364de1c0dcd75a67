//! Entity models and insert DTOs.

pub mod attempt;
