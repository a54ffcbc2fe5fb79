//! Per-record mutual exclusion for follow-up submissions.
//!
//! Submissions for one risk run one at a time; submissions for different
//! risks never contend. Entries are dropped from the table once nobody holds
//! or waits on them, so the table only ever contains in-flight risk ids.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use riskwatch_core::risk::RiskId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct RecordLocks {
  table: Mutex<HashMap<RiskId, Arc<AsyncMutex<()>>>>,
}

impl RecordLocks {
  /// Wait until no other submission for `risk_id` is in progress.
  pub(crate) async fn lock(&self, risk_id: &RiskId) -> RecordGuard<'_> {
    let cell = {
      let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
      table.entry(risk_id.clone()).or_default().clone()
    };
    let guard = cell.clone().lock_owned().await;
    RecordGuard {
      locks:   self,
      risk_id: risk_id.clone(),
      cell,
      guard:   Some(guard),
    }
  }

  #[cfg(test)]
  pub(crate) fn in_flight(&self) -> usize {
    self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

/// Held for the duration of one submission.
pub(crate) struct RecordGuard<'a> {
  locks:   &'a RecordLocks,
  risk_id: RiskId,
  cell:    Arc<AsyncMutex<()>>,
  guard:   Option<OwnedMutexGuard<()>>,
}

impl Drop for RecordGuard<'_> {
  fn drop(&mut self) {
    // Release first so the guard's own reference is gone before counting.
    self.guard.take();
    let mut table = self
      .locks
      .table
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    // One reference in the table, one here: nobody else is waiting.
    if Arc::strong_count(&self.cell) == 2 {
      table.remove(&self.risk_id);
    }
  }
}
