//! Command implementations

pub mod convert;
pub mod edit;
pub mod info;
pub mod validate;
