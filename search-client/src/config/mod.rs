//! Configuration for the search client.

mod dependencies;

pub use dependencies::Dependencies;
