// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Task scheduler for timed operations

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

struct ScheduledTask {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Named periodic tasks. Scheduling a name that is already running aborts
/// the old ticker first, so at most one ticker exists per name.
pub struct TaskScheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `task` every `interval`, first after one full interval.
    pub fn schedule<F, Fut>(&self, name: &str, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_task(name, Instant::now() + interval, interval, task);
    }

    /// Run `task` right away, then every `interval`.
    pub fn schedule_immediate<F, Fut>(&self, name: &str, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_task(name, Instant::now(), interval, task);
    }

    fn spawn_task<F, Fut>(&self, name: &str, start: Instant, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.remove(name) {
            previous.handle.abort();
            debug!("Replaced task '{}' ({:?} -> {:?})", name, previous.interval, interval);
        }

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                task().await;
            }
        });

        tasks.insert(name.to_string(), ScheduledTask { interval, handle });
        debug!("Scheduled task '{}' with interval {:?}", name, interval);
    }

    /// Abort the ticker. Returns false when nothing was scheduled.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(task) => {
                task.handle.abort();
                debug!("Cancelled task '{}'", name);
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn interval_of(&self, name: &str) -> Option<Duration> {
        self.tasks.lock().get(name).map(|t| t.interval)
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn cancel_all(&self) {
        for (name, task) in self.tasks.lock().drain() {
            task.handle.abort();
            debug!("Cancelled task '{}'", name);
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.get_mut().drain() {
            task.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send + Sync + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_each_interval() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("poll", Duration::from_millis(100), counting(&count));

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_immediate("poll", Duration::from_secs(5), counting(&count));

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_ticker() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("stream", Duration::from_millis(100), counting(&count));
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.schedule("stream", Duration::from_secs(1), counting(&count));
        assert_eq!(scheduler.task_names(), vec!["stream".to_string()]);
        assert_eq!(scheduler.interval_of("stream"), Some(Duration::from_secs(1)));

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        time::sleep(Duration::from_millis(700)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let scheduler = TaskScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("poll", Duration::from_millis(100), counting(&count));
        assert!(scheduler.is_scheduled("poll"));

        assert!(scheduler.cancel("poll"));
        assert!(!scheduler.cancel("poll"));
        assert!(!scheduler.is_scheduled("poll"));

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
