use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::time::{Duration, Instant};

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A queued task plus its scheduling key. Ordered by priority (higher
/// first), then by submission sequence (earlier first) so FIFO holds
/// within a priority tier.
struct QueuedTask {
    priority: u8,
    seq: u64,
    task: BoxedTask,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins; within a tier the lower
        // sequence number (earlier submission) wins.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Bounded-concurrency task queue with rate shaping and priority.
///
/// Two constraints gate every task start: at most `max_concurrency`
/// tasks executing at once (semaphore), and at most `starts_per_bucket`
/// starts within any fixed time bucket of length `bucket`. The queue has
/// no capacity cap of its own; callers gate admission on `backlog()`
/// before calling `add`.
pub struct JobQueue {
    pending: Mutex<BinaryHeap<QueuedTask>>,
    notify: Notify,
    slots: Arc<Semaphore>,
    in_flight: AtomicUsize,
    seq: AtomicU64,
    starts_per_bucket: u32,
    bucket: Duration,
}

impl JobQueue {
    pub fn new(max_concurrency: usize, starts_per_bucket: u32, bucket: Duration) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            slots: Arc::new(Semaphore::new(max_concurrency)),
            in_flight: AtomicUsize::new(0),
            seq: AtomicU64::new(0),
            starts_per_bucket,
            bucket,
        })
    }

    /// Tasks queued but not yet started.
    pub fn backlog(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Tasks currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(AtomicOrdering::SeqCst)
    }

    /// Enqueue a task at the given priority tier. Returns a receiver that
    /// resolves to the task's output once it has run. There is no
    /// cancellation: once started, a task runs to completion.
    pub fn add<T, F>(&self, priority: u8, fut: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task: BoxedTask = Box::pin(async move {
            // Receiver may have been dropped; the task still ran.
            let _ = tx.send(fut.await);
        });
        let seq = self.seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.pending.lock().unwrap().push(QueuedTask {
            priority,
            seq,
            task,
        });
        self.notify.notify_one();
        rx
    }

    /// Worker loop. Runs forever; spawn it once at startup.
    pub async fn run(self: Arc<Self>) {
        let mut bucket_start = Instant::now();
        let mut started_in_bucket: u32 = 0;

        loop {
            if self.pending.lock().unwrap().is_empty() {
                self.notify.notified().await;
                continue;
            }

            // Concurrency gate first: waiting here may cross bucket
            // boundaries, so the pacing window is refreshed after.
            let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
                return;
            };

            let now = Instant::now();
            if now.duration_since(bucket_start) >= self.bucket {
                bucket_start = now;
                started_in_bucket = 0;
            }
            if started_in_bucket >= self.starts_per_bucket {
                tokio::time::sleep_until(bucket_start + self.bucket).await;
                bucket_start = Instant::now();
                started_in_bucket = 0;
            }

            // Pop after both gates so a higher-priority task arriving
            // while we waited is dequeued first.
            let Some(entry) = self.pending.lock().unwrap().pop() else {
                drop(permit);
                continue;
            };

            started_in_bucket += 1;
            self.in_flight.fetch_add(1, AtomicOrdering::SeqCst);
            tracing::debug!(
                "Starting task seq={} priority={} (in-flight: {})",
                entry.seq,
                entry.priority,
                self.in_flight(),
            );

            let queue = Arc::clone(&self);
            tokio::spawn(async move {
                entry.task.await;
                queue.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
                drop(permit);
            });
        }
    }
}
