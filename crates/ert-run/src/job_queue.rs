//! Job queue contract and an in-process status board.

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Status of one realization's job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    NotActive,
    Waiting,
    Submitted,
    Pending,
    Running,
    Done,
    Exit,
    UserKilled,
    UserExit,
    Success,
    RunningCallback,
    Failed,
}

impl JobStatus {
    /// Counted as finished work when computing phase progress.
    pub fn is_done(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Done)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success
                | JobStatus::Done
                | JobStatus::Exit
                | JobStatus::UserKilled
                | JobStatus::UserExit
                | JobStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::NotActive => "JOB_QUEUE_NOT_ACTIVE",
            JobStatus::Waiting => "JOB_QUEUE_WAITING",
            JobStatus::Submitted => "JOB_QUEUE_SUBMITTED",
            JobStatus::Pending => "JOB_QUEUE_PENDING",
            JobStatus::Running => "JOB_QUEUE_RUNNING",
            JobStatus::Done => "JOB_QUEUE_DONE",
            JobStatus::Exit => "JOB_QUEUE_EXIT",
            JobStatus::UserKilled => "JOB_QUEUE_IS_KILLED",
            JobStatus::UserExit => "JOB_QUEUE_DO_KILL",
            JobStatus::Success => "JOB_QUEUE_SUCCESS",
            JobStatus::RunningCallback => "JOB_QUEUE_RUNNING_DONE_CALLBACK",
            JobStatus::Failed => "JOB_QUEUE_FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External job dispatch, polled by the run models for progress.
pub trait JobQueue: Send + Sync {
    fn is_running(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn job_status(&self, index: usize) -> JobStatus;

    fn kill_all_jobs(&self);

    /// Whether the user asked the queue to stop.
    fn user_exit(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct Board {
    running: bool,
    user_exit: bool,
    statuses: Vec<JobStatus>,
}

/// Thread-safe status board; forward models update it while the run model
/// reads it for progress.
#[derive(Debug, Default)]
pub struct SharedJobQueue {
    board: Mutex<Board>,
}

impl SharedJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new batch of `len` jobs, all waiting.
    pub fn start(&self, len: usize) {
        let mut board = self.lock();
        board.running = true;
        board.user_exit = false;
        board.statuses = vec![JobStatus::Waiting; len];
    }

    /// Out-of-range indices are ignored.
    pub fn set_status(&self, index: usize, status: JobStatus) {
        if let Some(slot) = self.lock().statuses.get_mut(index) {
            *slot = status;
        }
    }

    /// Mark the batch finished; statuses stay readable.
    pub fn finish(&self) {
        self.lock().running = false;
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.lock().statuses.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobQueue for SharedJobQueue {
    fn is_running(&self) -> bool {
        self.lock().running
    }

    fn len(&self) -> usize {
        self.lock().statuses.len()
    }

    fn job_status(&self, index: usize) -> JobStatus {
        self.lock()
            .statuses
            .get(index)
            .copied()
            .unwrap_or(JobStatus::NotActive)
    }

    fn kill_all_jobs(&self) {
        let mut board = self.lock();
        board.user_exit = true;
        for status in board.statuses.iter_mut().filter(|s| !s.is_terminal()) {
            *status = JobStatus::UserKilled;
        }
    }

    fn user_exit(&self) -> bool {
        self.lock().user_exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_update_statuses() {
        let queue = SharedJobQueue::new();
        assert!(!queue.is_running());
        assert!(queue.is_empty());

        queue.start(3);
        queue.set_status(1, JobStatus::Success);
        queue.set_status(7, JobStatus::Success);
        assert!(queue.is_running());
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.job_status(0), JobStatus::Waiting);
        assert_eq!(queue.job_status(1), JobStatus::Success);
        assert_eq!(queue.job_status(9), JobStatus::NotActive);

        queue.finish();
        assert!(!queue.is_running());
        assert_eq!(queue.statuses().len(), 3);
    }

    #[test]
    fn kill_all_spares_finished_jobs() {
        let queue = SharedJobQueue::new();
        queue.start(3);
        queue.set_status(0, JobStatus::Success);
        queue.set_status(1, JobStatus::Running);

        queue.kill_all_jobs();

        assert!(queue.user_exit());
        assert_eq!(
            queue.statuses(),
            vec![JobStatus::Success, JobStatus::UserKilled, JobStatus::UserKilled]
        );
    }

    #[test]
    fn done_states() {
        assert!(JobStatus::Success.is_done());
        assert!(JobStatus::Done.is_done());
        assert!(!JobStatus::Failed.is_done());
        assert!(!JobStatus::Running.is_done());
    }
}
