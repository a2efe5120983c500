//! In-process document container serving query pages and a change feed.

mod container;

pub use container::InMemoryContainer;
