//! Clock Port - Wall-clock Time Source

use crate::domain::types::Timestamp;

/// Trait for reading the current unix time in seconds.
pub trait Clock: Send + Sync + 'static {
  /// Current unix time in seconds.
  fn now(&self) -> Timestamp;
}
