use std::thread::JoinHandle;

/// Represents the eventual completion of scheduled work.
///
/// Scheduling returns immediately; results only become readable through `complete`, which blocks until the
/// work is done. There is no cancellation: once scheduled, a job runs to completion.
#[must_use = "scheduled work must be completed before its results can be read"]
pub struct JobHandle<T> {
    state: JobState<T>,
}

enum JobState<T> {
    Complete(T),
    Running(JoinHandle<T>),
}

impl<T: Send + 'static> JobHandle<T> {
    /// Wraps an already computed result.
    pub fn completed(value: T) -> Self {
        Self {
            state: JobState::Complete(value),
        }
    }

    /// Starts the job on its own worker thread.
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            state: JobState::Running(std::thread::spawn(job)),
        }
    }

    /// Spawns the job when `multi_threaded` is set and runs it inline otherwise.
    pub fn schedule<F>(multi_threaded: bool, job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if multi_threaded {
            Self::spawn(job)
        } else {
            Self::completed(job())
        }
    }

    /// Whether `complete` would return without blocking.
    pub fn is_completed(&self) -> bool {
        match &self.state {
            JobState::Complete(_) => true,
            JobState::Running(handle) => handle.is_finished(),
        }
    }

    /// Waits for the job and returns its result. A panic inside the job is resumed on the caller.
    pub fn complete(self) -> T {
        match self.state {
            JobState::Complete(value) => value,
            JobState::Running(handle) => match handle.join() {
                Ok(value) => value,
                Err(payload) => std::panic::resume_unwind(payload),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_schedule_is_already_complete() {
        let handle = JobHandle::schedule(false, || 41 + 1);
        assert!(handle.is_completed());
        assert_eq!(handle.complete(), 42);
    }

    #[test]
    fn spawned_job_completes() {
        let handle = JobHandle::schedule(true, || (0..1000u64).sum::<u64>());
        assert_eq!(handle.complete(), 499500);
    }

    #[test]
    #[should_panic(expected = "job failed")]
    fn panics_propagate_on_complete() {
        let handle: JobHandle<()> = JobHandle::spawn(|| panic!("job failed"));
        handle.complete();
    }
}
