//! Cascading invalidation of parent-dependent collections.

pub mod resolver;

pub use resolver::CascadeResolver;
