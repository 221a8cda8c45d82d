//! Custody adapters - fungible asset books.

pub mod memory;

pub use memory::{BooksSnapshot, InMemoryBooks, InMemoryCustody};
