//! Core types for the ERF pipeline

mod draft;
mod group;
mod record;
mod value;

pub use draft::{BodyFormat, Draft, Recipient};
pub use group::Group;
pub use record::{Record, fields};
pub use value::Value;

#[cfg(test)]
pub(crate) use record::test_support;
