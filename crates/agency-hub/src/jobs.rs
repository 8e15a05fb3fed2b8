use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-permit, fail-fast lock for long-running batch jobs.
///
/// A second `try_start` while a permit is alive is rejected immediately; there
/// is no queueing. The permit owns its share of the flag, so it can move onto a
/// spawned task and outlive the request that started the job. Dropping it on
/// any exit path of the job (success, error return, or panic unwinding) frees
/// the lock.
#[derive(Debug)]
pub struct JobLock {
    job: &'static str,
    running: Arc<AtomicBool>,
}

impl JobLock {
    pub fn new(job: &'static str) -> Self {
        Self {
            job,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_start(&self) -> Result<JobPermit, JobBusy> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| JobPermit {
                running: Arc::clone(&self.running),
            })
            .map_err(|_| JobBusy { job: self.job })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof that the holder is the only running instance of a job.
#[derive(Debug)]
pub struct JobPermit {
    running: Arc<AtomicBool>,
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{job} already in progress. Please wait until it finishes.")]
pub struct JobBusy {
    pub job: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_rejected_until_permit_drops() {
        let lock = JobLock::new("Recount");
        let permit = lock.try_start().expect("first start succeeds");
        assert!(lock.is_running());

        let busy = lock.try_start().expect_err("second start rejected");
        assert_eq!(busy.job, "Recount");
        assert_eq!(
            busy.to_string(),
            "Recount already in progress. Please wait until it finishes."
        );

        drop(permit);
        assert!(!lock.is_running());
        assert!(lock.try_start().is_ok());
    }

    #[test]
    fn permit_is_released_when_job_panics() {
        let lock = JobLock::new("Agency refresh");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _permit = lock.try_start().expect("start");
            panic!("job blew up");
        }));
        assert!(result.is_err());
        assert!(!lock.is_running());
    }

    #[test]
    fn independent_locks_do_not_block_each_other() {
        let refresh = JobLock::new("Agency refresh");
        let recount = JobLock::new("Recount");
        let _refresh = refresh.try_start().expect("refresh starts");
        assert!(recount.try_start().is_ok());
    }

    #[tokio::test]
    async fn permit_held_by_spawned_task_outlives_the_caller() {
        let lock = JobLock::new("Agency refresh");
        let permit = lock.try_start().expect("start");
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let job = tokio::spawn(async move {
            let _permit = permit;
            let _ = wait.await;
        });
        assert!(lock.try_start().is_err());

        let _ = release.send(());
        job.await.expect("job joins");
        assert!(!lock.is_running());
    }
}
