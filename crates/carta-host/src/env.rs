//! Main-thread environment and async job runner.
//!
//! An [`Env`] plays the part of the host's event loop. It owns:
//!
//! - a rayon thread pool that runs job bodies
//! - a completion channel that workers report into
//! - the table of pending jobs (pins, callback, completion step)
//! - the external memory hint images report to
//!
//! # Job lifecycle
//!
//! ```text
//!  submit ──spawn_fifo──▶ worker runs body ──send──▶ channel
//!    │                                                  │
//!    │ pins taken, record stored          run/poll on the Env thread
//!    ▼                                                  ▼
//!  pending table ◀───── record removed ─── callback(err, value) ─── pins dropped
//! ```
//!
//! `Env` is `!Send`: callbacks and host objects never leave the thread that
//! created them. Worker bodies only capture `Send` data (buffer handles and
//! owned inputs).
//!
//! # Example
//!
//! ```rust
//! use carta_host::{Env, Image, Value};
//!
//! let env = Env::new().unwrap();
//! let img = Image::with_size(&env, 4, 4).unwrap();
//! img.encode(&env, &[Value::from("png"), Value::function(|args: &[Value]| {
//!     assert!(args[0].is_null());
//! })]).unwrap();
//! env.run();
//! ```

use crate::image::Pin;
use crate::memory::{ExternalMemory, MemoryCounter};
use crate::{Error, Function, HostResult, Value};
use carta_core::RgbaBuffer;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, trace};

/// Identifier of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

/// What a worker body hands back to the main thread.
#[derive(Debug)]
pub(crate) enum JobOutput {
    /// Nothing beyond the side effect on a pinned buffer.
    Unit,
    /// Encoded bytes.
    Bytes(Vec<u8>),
    /// A freshly decoded buffer.
    Buffer(RgbaBuffer),
}

type Completion = (JobId, HostResult<JobOutput>);

/// Turns worker output into the callback's value on the main thread.
/// `None` means the callback receives only `(null)`.
type FinishFn = Box<dyn FnOnce(&Env, JobOutput) -> HostResult<Option<Value>>>;

struct PendingJob {
    name: &'static str,
    callback: Function,
    pins: Vec<Pin>,
    finish: FinishFn,
}

/// Builder for [`Env`].
///
/// ```rust
/// use carta_host::{EnvBuilder, NoopMemory};
/// use std::rc::Rc;
///
/// let env = EnvBuilder::new()
///     .worker_threads(2)
///     .thread_name_prefix("tiles")
///     .memory(Rc::new(NoopMemory))
///     .build()
///     .unwrap();
/// assert_eq!(env.worker_threads(), 2);
/// ```
pub struct EnvBuilder {
    worker_threads: usize,
    thread_name_prefix: String,
    memory: Option<Rc<dyn ExternalMemory>>,
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name_prefix: "carta-worker".to_string(),
            memory: None,
        }
    }
}

impl EnvBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of worker threads; `0` lets rayon decide.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Prefix for worker thread names.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// External memory backend; a [`MemoryCounter`] by default.
    pub fn memory(mut self, memory: Rc<dyn ExternalMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Builds the environment and its worker pool.
    pub fn build(self) -> HostResult<Env> {
        let prefix = self.thread_name_prefix;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| Error::Internal(e.to_string()))?;
        let (sender, receiver) = mpsc::channel();

        debug!(threads = pool.current_num_threads(), "env ready");
        Ok(Env {
            pool,
            sender,
            receiver,
            jobs: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            memory: self.memory.unwrap_or_else(|| Rc::new(MemoryCounter::new())),
        })
    }
}

/// Main-thread context: worker pool, completion queue and pending jobs.
pub struct Env {
    pool: rayon::ThreadPool,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    jobs: RefCell<HashMap<JobId, PendingJob>>,
    next_id: Cell<u64>,
    memory: Rc<dyn ExternalMemory>,
}

impl Env {
    /// Environment with default settings.
    pub fn new() -> HostResult<Self> {
        EnvBuilder::default().build()
    }

    /// Builder for a configured environment.
    pub fn builder() -> EnvBuilder {
        EnvBuilder::default()
    }

    /// Number of worker threads.
    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// External memory backend.
    pub fn memory(&self) -> &Rc<dyn ExternalMemory> {
        &self.memory
    }

    /// Total currently announced to the memory backend.
    pub fn announced_memory(&self) -> i64 {
        self.memory.adjust(0)
    }

    /// Number of jobs queued or running whose callback has not run yet.
    pub fn pending(&self) -> usize {
        self.jobs.borrow().len()
    }

    /// Queues `work` on the pool.
    ///
    /// `pins` are held until the callback has returned. `finish` runs on this
    /// thread after a successful body and produces the callback's value.
    pub(crate) fn submit<W, F>(
        &self,
        name: &'static str,
        pins: Vec<Pin>,
        callback: Function,
        work: W,
        finish: F,
    ) -> JobId
    where
        W: FnOnce() -> HostResult<JobOutput> + Send + 'static,
        F: FnOnce(&Env, JobOutput) -> HostResult<Option<Value>> + 'static,
    {
        let id = JobId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.jobs.borrow_mut().insert(
            id,
            PendingJob {
                name,
                callback,
                pins,
                finish: Box::new(finish),
            },
        );
        debug!(job = id.0, name, "job queued");

        let sender = self.sender.clone();
        self.pool.spawn_fifo(move || {
            trace!(job = id.0, name, "job running");
            let result = panic::catch_unwind(AssertUnwindSafe(work))
                .unwrap_or_else(|payload| Err(Error::Internal(panic_message(payload))));
            // A closed channel means the Env is gone and nobody is left to
            // receive the completion.
            let _ = sender.send((id, result));
        });
        id
    }

    /// Waits for one completion and dispatches it.
    ///
    /// Returns `false` without blocking when nothing is pending.
    pub fn run_once(&self) -> bool {
        if self.pending() == 0 {
            return false;
        }
        match self.receiver.recv() {
            Ok((id, result)) => {
                self.dispatch(id, result);
                true
            }
            Err(_) => false,
        }
    }

    /// Dispatches completions until no job is pending, including jobs queued
    /// by callbacks. Returns the number of callbacks invoked.
    pub fn run(&self) -> usize {
        let mut count = 0;
        while self.run_once() {
            count += 1;
        }
        count
    }

    /// Dispatches completions that are already available, without blocking.
    pub fn poll(&self) -> usize {
        let mut count = 0;
        while let Ok((id, result)) = self.receiver.try_recv() {
            self.dispatch(id, result);
            count += 1;
        }
        count
    }

    fn dispatch(&self, id: JobId, result: HostResult<JobOutput>) {
        let Some(job) = self.jobs.borrow_mut().remove(&id) else {
            return;
        };
        let PendingJob {
            name,
            callback,
            pins,
            finish,
        } = job;

        match result.and_then(|output| finish(self, output)) {
            Ok(Some(value)) => {
                debug!(job = id.0, name, "job completed");
                callback.call(&[Value::Null, value]);
            }
            Ok(None) => {
                debug!(job = id.0, name, "job completed");
                callback.call(&[Value::Null]);
            }
            Err(err) => {
                debug!(job = id.0, name, error = %err, "job failed");
                callback.call(&[Value::Error(err)]);
            }
        }
        drop(pins);
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("worker_threads", &self.worker_threads())
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
