//! Bounded FIFO transfer queue.
//!
//! At most `max_concurrent` transfers run at once, each on its own tokio task.
//! A finishing transfer admits the next queued one, so work only advances when
//! a slot frees up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::Notify;
use tracing::Instrument;

use super::runner::{process_transfer, TransferContext};
use crate::db::{destination_repo, file_repo, group_repo, FileUpdate, GroupStatus, GroupUpdate};
use crate::error::TransferError;

/// One file headed for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub file_id: i64,
    pub destination_id: i64,
    /// Owning group, looked up when queued; drives the group roll-up.
    pub group_id: Option<i64>,
}

#[derive(Default)]
struct SchedulerState {
    queue: VecDeque<TransferRequest>,
    running: Vec<TransferRequest>,
    /// Occupied slots. A slot stays occupied until the group roll-up of its
    /// transfer is written, which can be after it leaves `running`.
    active: usize,
}

impl SchedulerState {
    fn contains_file(&self, file_id: i64) -> bool {
        self.queue
            .iter()
            .chain(self.running.iter())
            .any(|r| r.file_id == file_id)
    }

    fn references_destination(&self, destination_id: i64) -> bool {
        self.queue
            .iter()
            .chain(self.running.iter())
            .any(|r| r.destination_id == destination_id)
    }

    fn has_pending_for_group(&self, group_id: i64) -> bool {
        self.queue
            .iter()
            .chain(self.running.iter())
            .any(|r| r.group_id == Some(group_id))
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active == 0
    }
}

struct SchedulerInner {
    ctx: TransferContext,
    max_concurrent: usize,
    state: Mutex<SchedulerState>,
    idle: Notify,
}

/// Queue of file transfers with a concurrency cap.
///
/// Cloning is cheap; clones share one queue.
#[derive(Clone)]
pub struct TransferScheduler {
    inner: Arc<SchedulerInner>,
}

impl TransferScheduler {
    /// A `max_concurrent` of zero is treated as one.
    pub fn new(ctx: TransferContext, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                ctx,
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(SchedulerState::default()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn context(&self) -> &TransferContext {
        &self.inner.ctx
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of transfers waiting for a slot.
    pub fn queued_count(&self) -> usize {
        self.lock().queue.len()
    }

    /// Number of transfers currently running.
    pub fn active_count(&self) -> usize {
        self.lock().active
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Queues each file for `destination_id` and starts as many as the cap
    /// allows. Returns how many were accepted; a file already queued or running
    /// is not queued twice.
    ///
    /// Returns immediately. Outcomes are recorded on each file.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn queue_transfers(&self, file_ids: &[i64], destination_id: i64) -> usize {
        let lookups: Vec<TransferRequest> = file_ids
            .iter()
            .map(|&file_id| TransferRequest {
                file_id,
                destination_id,
                group_id: self.owning_group(file_id),
            })
            .collect();

        let accepted = {
            let mut state = self.lock();
            let mut accepted = 0;
            for request in lookups {
                if state.contains_file(request.file_id) {
                    debug!("File {} is already queued, skipping", request.file_id);
                    continue;
                }
                state.queue.push_back(request);
                accepted += 1;
            }
            accepted
        };

        info!(
            "Queued {} transfers to destination {}",
            accepted, destination_id
        );
        self.drain();
        accepted
    }

    /// Queues every confirmed file of each group.
    ///
    /// The destination must exist; it is recorded on each group and file before
    /// they are queued.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn queue_group_transfers(
        &self,
        group_ids: &[i64],
        destination_id: i64,
    ) -> Result<usize, TransferError> {
        let db = &self.inner.ctx.db;
        if destination_repo::find_by_id(db, destination_id)?.is_none() {
            return Err(TransferError::EntityNotFound {
                kind: "destination",
                id: destination_id,
            });
        }

        let mut file_ids = Vec::new();
        for &group_id in group_ids {
            let files = file_repo::list_for_group_with_status(db, group_id, GroupStatus::Confirmed)?;
            if files.is_empty() {
                debug!("Group {} has no confirmed files", group_id);
                continue;
            }
            group_repo::update(
                db,
                group_id,
                &GroupUpdate {
                    destination_id: Some(Some(destination_id)),
                    ..Default::default()
                },
            )?;
            for file in files {
                file_repo::update(
                    db,
                    file.id,
                    &FileUpdate {
                        destination_id: Some(Some(destination_id)),
                        ..Default::default()
                    },
                )?;
                file_ids.push(file.id);
            }
        }
        Ok(self.queue_transfers(&file_ids, destination_id))
    }

    /// Deletes a destination that no queued or running transfer references.
    pub fn delete_destination(&self, destination_id: i64) -> Result<(), TransferError> {
        // Held across the delete so nothing can be queued for it meanwhile.
        let state = self.lock();
        if state.references_destination(destination_id) {
            return Err(TransferError::DestinationInUse(destination_id));
        }
        if !destination_repo::delete(&self.inner.ctx.db, destination_id)? {
            return Err(TransferError::EntityNotFound {
                kind: "destination",
                id: destination_id,
            });
        }
        drop(state);
        info!("Deleted destination {}", destination_id);
        Ok(())
    }

    /// Resolves once nothing is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn owning_group(&self, file_id: i64) -> Option<i64> {
        match file_repo::find_by_id(&self.inner.ctx.db, file_id) {
            Ok(file) => file.and_then(|f| f.group_id),
            Err(e) => {
                warn!("Could not look up file {}: {}", file_id, e);
                None
            }
        }
    }

    /// Starts queued transfers until the cap is reached.
    fn drain(&self) {
        let started: Vec<TransferRequest> = {
            let mut state = self.lock();
            let mut started = Vec::new();
            while state.active < self.inner.max_concurrent {
                let Some(request) = state.queue.pop_front() else {
                    break;
                };
                state.active += 1;
                state.running.push(request);
                started.push(request);
            }
            started
        };

        for request in started {
            let scheduler = self.clone();
            let span = tracing::info_span!("transfer", file_id = request.file_id);
            tokio::spawn(
                async move {
                    scheduler.run(request).await;
                }
                .instrument(span),
            );
        }
    }

    async fn run(&self, request: TransferRequest) {
        let ctx = &self.inner.ctx;
        if let Some(group_id) = request.group_id {
            match group_repo::transition_status(
                &ctx.db,
                group_id,
                &[GroupStatus::Confirmed],
                GroupStatus::Transferring,
            ) {
                Ok(true) => info!("Group {} is transferring", group_id),
                Ok(false) => {}
                Err(e) => warn!("Could not mark group {} transferring: {}", group_id, e),
            }
        }

        if let Err(e) = process_transfer(ctx, request.file_id, request.destination_id).await {
            error!("Transfer of file {} aborted: {}", request.file_id, e);
        }

        let group_settled = {
            let mut state = self.lock();
            state.running.retain(|r| r.file_id != request.file_id);
            request
                .group_id
                .filter(|&group_id| !state.has_pending_for_group(group_id))
        };
        if let Some(group_id) = group_settled {
            self.roll_up_group(group_id);
        }

        let idle = {
            let mut state = self.lock();
            state.active -= 1;
            state.is_idle()
        };
        self.drain();
        if idle {
            self.inner.idle.notify_waiters();
        }
    }

    /// Settles a transferring group once none of its files is pending: completed
    /// if every transferred file completed, failed otherwise.
    fn roll_up_group(&self, group_id: i64) {
        let db = &self.inner.ctx.db;
        let files = match file_repo::list_for_group(db, group_id) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not load files of group {}: {}", group_id, e);
                return;
            }
        };
        if files.iter().any(|f| f.status == GroupStatus::Transferring) {
            return;
        }
        let transferred: Vec<_> = files
            .iter()
            .filter(|f| f.status.is_terminal_transfer())
            .collect();
        if transferred.is_empty() {
            return;
        }
        let to = if transferred
            .iter()
            .all(|f| f.status == GroupStatus::Completed)
        {
            GroupStatus::Completed
        } else {
            GroupStatus::Failed
        };
        match group_repo::transition_status(db, group_id, &[GroupStatus::Transferring], to) {
            Ok(true) => info!("Group {} transfer {}", group_id, to),
            Ok(false) => {}
            Err(e) => warn!("Could not settle group {}: {}", group_id, e),
        }
    }
}
