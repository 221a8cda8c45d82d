//! Per-proposal mutual exclusion.
//!
//! Every mutating engine entry point runs under its proposal's lock for
//! the whole operation, including calls out to the adapter, custody and
//! the exchange. Concurrent callers queue behind the holder. A call that
//! re-enters the engine for a proposal its own task already holds is
//! rejected, since waiting would deadlock.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::error::{Result, VenueError};
use crate::domain::types::ProposalId;

tokio::task_local! {
  /// Proposals locked by the operation currently being polled.
  static HELD: HashSet<ProposalId>;
}

/// Lock table keyed by proposal id.
#[derive(Debug, Default)]
pub struct ProposalLocks {
  locks: Mutex<HashMap<ProposalId, Arc<Mutex<()>>>>,
}

impl ProposalLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `operation` while holding the proposal's lock.
  ///
  /// Waits for any operation in flight on the same proposal. Fails with a
  /// `State` error, without running `operation`, when called from inside
  /// an operation that already holds this proposal. The lock is released
  /// on every exit path.
  pub async fn serialize<F, T>(&self, id: ProposalId, operation: F) -> Result<T>
  where
    F: Future<Output = Result<T>>,
  {
    let mut held = HELD.try_with(Clone::clone).unwrap_or_default();
    if held.contains(&id) {
      return Err(VenueError::State(format!(
        "re-entrant call on proposal {id} while it is being updated"
      )));
    }

    let lock = {
      let mut locks = self.locks.lock().await;
      Arc::clone(locks.entry(id).or_default())
    };
    let _guard = lock.lock_owned().await;

    held.insert(id);
    HELD.scope(held, operation).await
  }
}
