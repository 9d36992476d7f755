//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the comparison use case.

mod comparison;
mod external;

#[cfg(test)]
pub(crate) mod test_support;

pub use comparison::ComparisonService;
pub use external::ExternalModels;
