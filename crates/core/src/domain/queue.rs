// Job Queue Domain Model

use super::job::{Job, JobId};
use super::job_status::{JobEvent, JobStatusFilter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared job handle; the job lives as long as the queue or a dialog holds it
pub type SharedJob = Arc<Mutex<Job>>;

pub fn shared(job: Job) -> SharedJob {
    Arc::new(Mutex::new(job))
}

/// Ordered set of jobs waiting for (or taking part in) one dialog.
///
/// Ids are dialog-scoped: they are unique while the job is queued and start
/// at 1 for every new queue. The queue keeps each id next to its handle, so
/// lookups never lock a job.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<(JobId, SharedJob)>,
    next_id: JobId,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job, assign its id and move it to `Enqueued`
    pub async fn enqueue(&mut self, job: SharedJob) -> JobId {
        self.next_id += 1;
        let id = self.next_id;
        {
            let mut guard = job.lock().await;
            guard.set_id(id);
            guard.apply(JobEvent::Enqueue);
            debug!(job_id = id, job = %guard.name(), "Job enqueued");
        }
        self.jobs.push((id, job));
        id
    }

    pub fn get_by_id(&self, id: JobId) -> Option<SharedJob> {
        self.jobs
            .iter()
            .find(|(job_id, _)| *job_id == id)
            .map(|(_, job)| Arc::clone(job))
    }

    /// Jobs whose status matches `filter`, in queue order.
    ///
    /// A job whose lock is held elsewhere is busy and skipped.
    pub fn jobs_with_status(&self, filter: JobStatusFilter) -> Vec<SharedJob> {
        let mut out = Vec::new();
        for (id, job) in &self.jobs {
            match job.try_lock() {
                Ok(guard) if filter.matches(guard.status()) => out.push(Arc::clone(job)),
                Ok(_) => {}
                Err(_) => debug!(job_id = *id, "Job is locked, skipping"),
            }
        }
        out
    }

    /// Drop the queue's reference to a job
    pub fn remove(&mut self, id: JobId) -> Option<SharedJob> {
        let index = self.jobs.iter().position(|(job_id, _)| *job_id == id)?;
        Some(self.jobs.remove(index).1)
    }

    /// Ids in queue order
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|(id, _)| *id).collect()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &SharedJob> {
        self.jobs.iter().map(|(_, job)| job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::JobDefinition;
    use crate::domain::job_status::JobStatus;
    use crate::domain::user::{CryptMode, User};
    use crate::port::time_provider::FixedTimeProvider;
    use serde_json::Value;

    fn job(name: &str) -> SharedJob {
        let user = User::new("u1", "C1", CryptMode::Pintan);
        let def = JobDefinition::new(name, "HKSAL", 7);
        shared(Job::new(
            def,
            Value::Null,
            &user,
            Arc::new(FixedTimeProvider::new(0)),
            "aqhbci",
        ))
    }

    #[tokio::test]
    async fn test_enqueue_assigns_ids() {
        let mut queue = JobQueue::new();
        let a = queue.enqueue(job("A")).await;
        let b = queue.enqueue(job("B")).await;
        assert_eq!((a, b), (1, 2));
        assert_eq!(queue.ids(), vec![1, 2]);

        let found = queue.get_by_id(2).unwrap();
        {
            let guard = found.lock().await;
            assert_eq!(guard.name(), "B");
            assert_eq!(guard.status(), JobStatus::Enqueued);
        }
        assert!(queue.get_by_id(3).is_none());
    }

    #[tokio::test]
    async fn test_lookup_while_a_job_is_locked() {
        let mut queue = JobQueue::new();
        queue.enqueue(job("A")).await;
        queue.enqueue(job("B")).await;

        let held = queue.get_by_id(2).unwrap();
        let _guard = held.lock().await;

        // none of these may wait for the held lock
        assert!(queue.get_by_id(1).is_some());
        assert!(queue.get_by_id(2).is_some());
        let enqueued = queue.jobs_with_status(JobStatus::Enqueued.into());
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].lock().await.name(), "A");
        assert!(queue.remove(2).is_some());
        assert_eq!(queue.ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_jobs_with_status() {
        let mut queue = JobQueue::new();
        queue.enqueue(job("A")).await;
        queue.enqueue(job("B")).await;
        queue.get_by_id(1).unwrap().lock().await.set_status(JobStatus::Error);

        assert_eq!(queue.jobs_with_status(JobStatusFilter::All).len(), 2);
        let failed = queue.jobs_with_status(JobStatus::Error.into());
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].lock().await.name(), "A");
    }

    #[tokio::test]
    async fn test_job_outlives_queue_reference() {
        let mut queue = JobQueue::new();
        let handle = job("A");
        queue.enqueue(handle.clone()).await;
        assert_eq!(Arc::strong_count(&handle), 2);

        let removed = queue.remove(1).unwrap();
        drop(removed);
        assert!(queue.is_empty());
        assert_eq!(Arc::strong_count(&handle), 1);
        assert_eq!(handle.lock().await.name(), "A");
    }
}
