//! Exchange adapters - constant-product conversion pools.

pub mod pools;

pub use pools::{ConstantProductPools, PairEntry};
