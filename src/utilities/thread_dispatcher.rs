use std::sync::atomic::{AtomicUsize, Ordering};

/// Provides multithreading dispatch primitives and a thread count for the simulation to use.
///
/// Note that the simulation does not require a true load balancing for loop implementation. All that's needed is a way to jumpstart some threads.
/// Systems which use multithreading claim their own work (see `JobCounter`), so the dispatcher only has to start workers and wait for them.
pub trait ThreadDispatcher: Send + Sync {
    /// Gets the number of workers available in the thread dispatcher.
    /// Zero means every dispatch executes inline on the calling thread.
    fn thread_count(&self) -> usize;

    /// Dispatches up to `maximum_worker_count` workers and blocks until all of them return.
    ///
    /// # Arguments
    ///
    /// * `worker_body` - Function invoked on every worker with the worker's index.
    /// * `maximum_worker_count` - Maximum number of workers to dispatch.
    fn dispatch_workers(&self, worker_body: &(dyn Fn(usize) + Sync), maximum_worker_count: usize);
}

/// Dispatcher that starts scoped threads for every dispatch.
///
/// A thread count of zero runs the worker body on the caller; this is the single threaded mode used to
/// check that multithreaded execution produces identical results.
#[derive(Clone, Copy, Debug)]
pub struct SimpleThreadDispatcher {
    thread_count: usize,
}

impl SimpleThreadDispatcher {
    pub fn new(thread_count: usize) -> Self {
        Self { thread_count }
    }

    /// Creates a dispatcher with one worker per available hardware thread.
    pub fn with_available_parallelism() -> Self {
        let thread_count = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::new(thread_count)
    }
}

impl ThreadDispatcher for SimpleThreadDispatcher {
    fn thread_count(&self) -> usize {
        self.thread_count
    }

    fn dispatch_workers(&self, worker_body: &(dyn Fn(usize) + Sync), maximum_worker_count: usize) {
        let worker_count = self.thread_count.min(maximum_worker_count);
        if worker_count == 0 {
            if maximum_worker_count > 0 {
                worker_body(0);
            }
            return;
        }
        let result = crossbeam_utils::thread::scope(|scope| {
            for worker_index in 0..worker_count {
                scope.spawn(move |_| worker_body(worker_index));
            }
        });
        if let Err(payload) = result {
            std::panic::resume_unwind(payload);
        }
    }
}

/// Hands out job indices to workers. Every index in `0..job_count` is returned exactly once across all callers.
#[derive(Debug)]
pub struct JobCounter {
    next_job_index: AtomicUsize,
    job_count: usize,
}

impl JobCounter {
    pub fn new(job_count: usize) -> Self {
        Self {
            next_job_index: AtomicUsize::new(0),
            job_count,
        }
    }

    #[inline(always)]
    pub fn try_get_job(&self) -> Option<usize> {
        let job_index = self.next_job_index.fetch_add(1, Ordering::Relaxed);
        (job_index < self.job_count).then_some(job_index)
    }
}

/// Runs `job(job_index)` for every index in `0..job_count`, spreading the jobs over the dispatcher's workers.
/// Without a dispatcher the jobs execute in order on the calling thread.
pub fn for_each_job(dispatcher: Option<&dyn ThreadDispatcher>, job_count: usize, job: &(dyn Fn(usize) + Sync)) {
    match dispatcher {
        Some(dispatcher) if job_count > 1 && dispatcher.thread_count() > 0 => {
            let counter = JobCounter::new(job_count);
            dispatcher.dispatch_workers(
                &|_worker_index| {
                    while let Some(job_index) = counter.try_get_job() {
                        job(job_index);
                    }
                },
                job_count,
            );
        }
        _ => (0..job_count).for_each(job),
    }
}
