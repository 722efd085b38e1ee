//! In-memory job registry: groups of pending jobs plus per-job status records.
//!
//! Both registries sit behind one [`RwLock`]. Every public method takes the
//! lock once, for the duration of that method only, and never awaits anything
//! else while holding it. Test-runner invocations therefore always happen with
//! the lock released.

use std::collections::HashMap;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::job::{GroupKey, JobPayload};
use crate::status::{JobResult, JobState, StatusRecord};
use crate::types::{GroupId, JobId};

/// A snapshot of one bucket handed to the execution engine.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub key: GroupKey,
    /// Jobs in arrival order.
    pub jobs: Vec<(JobId, JobPayload)>,
}

struct Bucket {
    key: GroupKey,
    jobs: Vec<(JobId, JobPayload)>,
    /// Set once `next_group` has handed this bucket out. A dequeued bucket
    /// accepts no further jobs.
    dequeued: bool,
}

#[derive(Default)]
struct Registry {
    /// Buckets keyed by instance id. Ids increase monotonically, so map order
    /// is bucket-creation order.
    groups: IndexMap<GroupId, Bucket>,
    /// The bucket currently accepting new jobs for each key.
    open: HashMap<GroupKey, GroupId>,
    statuses: HashMap<JobId, StatusRecord>,
    next_group_id: u64,
}

/// Registry of job groups and status records.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between request handlers and the scheduler.
#[derive(Default)]
pub struct JobStore {
    inner: RwLock<Registry>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job and return its freshly generated id.
    ///
    /// The job is appended to the open bucket for its [`GroupKey`], creating a
    /// new bucket when none is open. A `queued` status record is created.
    pub async fn enqueue(&self, job: JobPayload) -> JobId {
        let job_id = JobId::new();
        let key = GroupKey::of(&job);

        let mut guard = self.inner.write().await;
        let reg = &mut *guard;

        let group_id = match reg.open.get(&key).copied() {
            Some(id) => id,
            None => {
                let id = GroupId(reg.next_group_id);
                reg.next_group_id += 1;
                reg.groups.insert(
                    id,
                    Bucket {
                        key: key.clone(),
                        jobs: Vec::new(),
                        dequeued: false,
                    },
                );
                reg.open.insert(key.clone(), id);
                tracing::debug!(group_id = %id, group_key = %key, "Created job group");
                id
            }
        };

        if let Some(bucket) = reg.groups.get_mut(&group_id) {
            bucket.jobs.push((job_id, job));
        }
        reg.statuses.insert(job_id, StatusRecord::queued(job_id));

        job_id
    }

    /// Current status of `job_id`, or a synthetic `not_found` record.
    pub async fn get_status(&self, job_id: &JobId) -> StatusRecord {
        self.inner
            .read()
            .await
            .statuses
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| StatusRecord::not_found(job_id.to_string()))
    }

    /// Hand out the oldest non-empty bucket that has not been dequeued yet.
    ///
    /// The bucket stays in the registry (and in the debug listing) until
    /// [`remove_group`](Self::remove_group) is called, but stops accepting
    /// jobs: later submissions under the same key open a new bucket.
    pub async fn next_group(&self) -> Option<Group> {
        let mut guard = self.inner.write().await;
        let reg = &mut *guard;

        let (id, bucket) = reg
            .groups
            .iter_mut()
            .find(|(_, b)| !b.dequeued && !b.jobs.is_empty())?;

        bucket.dequeued = true;
        let group = Group {
            id: *id,
            key: bucket.key.clone(),
            jobs: bucket.jobs.clone(),
        };

        if reg.open.get(&group.key) == Some(&group.id) {
            reg.open.remove(&group.key);
        }

        Some(group)
    }

    /// Delete the oldest bucket for `key`. No-op if there is none.
    ///
    /// While a group is in flight its bucket is always the oldest one for
    /// its key, so this removes exactly the group that just finished.
    pub async fn remove_group(&self, key: &GroupKey) {
        let mut reg = self.inner.write().await;

        let Some(index) = reg.groups.values().position(|b| &b.key == key) else {
            return;
        };
        if let Some((id, _)) = reg.groups.shift_remove_index(index) {
            if reg.open.get(key) == Some(&id) {
                reg.open.remove(key);
            }
            tracing::debug!(group_id = %id, group_key = %key, "Removed job group");
        }
    }

    /// Move a queued job to `running`.
    pub async fn mark_running(&self, job_id: &JobId) -> Result<(), CoreError> {
        let mut reg = self.inner.write().await;
        let record = lookup(&mut reg.statuses, job_id)?;
        transition(record, job_id, JobState::Running)?;
        record.started_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Move a running job to a terminal state, recording its outcome.
    pub async fn mark_finished(
        &self,
        job_id: &JobId,
        state: JobState,
        message: String,
        result: JobResult,
    ) -> Result<(), CoreError> {
        let mut reg = self.inner.write().await;
        let record = lookup(&mut reg.statuses, job_id)?;
        if !state.is_terminal() {
            return Err(CoreError::InvalidTransition {
                job_id: *job_id,
                from: record.status,
                to: state,
            });
        }
        transition(record, job_id, state)?;
        record.message = Some(message);
        record.result = Some(result);
        record.finished_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Job ids per non-empty group, keyed by the group key's textual form,
    /// in bucket-creation order.
    ///
    /// If an in-flight bucket and a newer bucket share a key, their ids are
    /// listed together under that key, oldest first.
    pub async fn group_listing(&self) -> IndexMap<String, Vec<JobId>> {
        let reg = self.inner.read().await;
        let mut listing: IndexMap<String, Vec<JobId>> = IndexMap::new();
        for bucket in reg.groups.values().filter(|b| !b.jobs.is_empty()) {
            listing
                .entry(bucket.key.to_string())
                .or_default()
                .extend(bucket.jobs.iter().map(|(id, _)| *id));
        }
        listing
    }

    /// Number of buckets currently registered (pending or in flight).
    pub async fn group_count(&self) -> usize {
        self.inner.read().await.groups.len()
    }

    /// Number of status records ever created.
    pub async fn job_count(&self) -> usize {
        self.inner.read().await.statuses.len()
    }
}

fn lookup<'a>(
    statuses: &'a mut HashMap<JobId, StatusRecord>,
    job_id: &JobId,
) -> Result<&'a mut StatusRecord, CoreError> {
    statuses.get_mut(job_id).ok_or_else(|| CoreError::NotFound {
        entity: "Job",
        id: job_id.to_string(),
    })
}

fn transition(record: &mut StatusRecord, job_id: &JobId, to: JobState) -> Result<(), CoreError> {
    if !record.status.can_transition_to(to) {
        return Err(CoreError::InvalidTransition {
            job_id: *job_id,
            from: record.status,
            to,
        });
    }
    record.status = to;
    Ok(())
}
