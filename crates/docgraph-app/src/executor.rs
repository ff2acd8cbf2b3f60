/// A unit of collaborator work. It reports back over a channel, never by return value.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where collaborator calls run.
pub trait Executor {
    fn spawn(&self, job: Job);
}

/// One OS thread per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn spawn(&self, job: Job) {
        std::thread::spawn(job);
    }
}

/// Runs the job before `spawn` returns. Results still arrive through `pump`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn spawn(&self, job: Job) {
        job();
    }
}
