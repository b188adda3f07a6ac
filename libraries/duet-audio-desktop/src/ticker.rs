//! Fixed-rate frame ticks on one shared background thread

use crate::error::DeviceError;
use duet_playback::{FrameCallback, FrameScheduler, FrameTask};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Registrations {
    next_id: u64,
    callbacks: Vec<(u64, FrameCallback)>,
    /// A tick thread is alive and will see new callbacks
    running: bool,
}

/// [`FrameScheduler`] that drives every task from a single repaint thread
///
/// The thread starts with the first task and exits once the last one is
/// cancelled. Ticks that fall behind are skipped rather than replayed.
#[derive(Clone)]
pub struct FrameTicker {
    interval: Duration,
    registrations: Arc<Mutex<Registrations>>,
}

impl FrameTicker {
    /// Tick every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            registrations: Arc::new(Mutex::new(Registrations::default())),
        }
    }

    /// Tick `rate` times per second
    pub fn with_rate(rate: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(rate.max(1))))
    }

    /// Interval between ticks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of tasks currently ticking
    pub fn active_tasks(&self) -> usize {
        self.registrations.lock().callbacks.len()
    }

    /// Whether the tick thread is alive
    pub fn is_running(&self) -> bool {
        self.registrations.lock().running
    }

    fn run(interval: Duration, registrations: &Mutex<Registrations>) {
        let mut next = Instant::now() + interval;
        loop {
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }

            let callbacks: Vec<FrameCallback> = {
                let mut regs = registrations.lock();
                if regs.callbacks.is_empty() {
                    regs.running = false;
                    break;
                }
                regs.callbacks.iter().map(|(_, tick)| Arc::clone(tick)).collect()
            };
            // Outside the lock: a tick may cancel its own task
            for tick in callbacks {
                tick();
            }

            next += interval;
            let now = Instant::now();
            if next < now {
                next = now + interval;
            }
        }
        tracing::debug!("Frame thread idle, exiting");
    }
}

impl FrameScheduler for FrameTicker {
    fn schedule(&self, tick: FrameCallback) -> duet_playback::Result<Box<dyn FrameTask>> {
        let mut regs = self.registrations.lock();
        if !regs.running {
            let interval = self.interval;
            let shared = Arc::clone(&self.registrations);
            thread::Builder::new()
                .name("duet-frames".into())
                .spawn(move || Self::run(interval, &shared))
                .map_err(|e| {
                    tracing::error!("Failed to spawn frame thread: {}", e);
                    DeviceError::Device(format!("frame thread: {e}"))
                })?;
            regs.running = true;
        }

        let id = regs.next_id;
        regs.next_id += 1;
        regs.callbacks.push((id, tick));

        Ok(Box::new(TickerTask {
            id,
            registrations: Arc::downgrade(&self.registrations),
        }))
    }
}

impl std::fmt::Debug for FrameTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let regs = self.registrations.lock();
        f.debug_struct("FrameTicker")
            .field("interval", &self.interval)
            .field("tasks", &regs.callbacks.len())
            .field("running", &regs.running)
            .finish()
    }
}

/// Registration of one callback on the tick thread
struct TickerTask {
    id: u64,
    registrations: Weak<Mutex<Registrations>>,
}

impl FrameTask for TickerTask {
    fn cancel(self: Box<Self>) {
        // Drop removes the registration
    }
}

impl Drop for TickerTask {
    fn drop(&mut self) {
        if let Some(registrations) = self.registrations.upgrade() {
            registrations.lock().callbacks.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::ThreadId;

    #[test]
    fn ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let ticker = FrameTicker::new(Duration::from_millis(2));

        let task = ticker
            .schedule(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        task.cancel();

        // Allow an in-flight tick to land
        thread::sleep(Duration::from_millis(10));
        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel > 0);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn tasks_share_one_thread() {
        let ticker = FrameTicker::new(Duration::from_millis(2));
        let seen: Arc<Mutex<Vec<(usize, ThreadId)>>> = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<Box<dyn FrameTask>> = (0..3)
            .map(|n| {
                let seen = Arc::clone(&seen);
                ticker
                    .schedule(Arc::new(move || {
                        seen.lock().push((n, thread::current().id()));
                    }))
                    .unwrap()
            })
            .collect();
        assert_eq!(ticker.active_tasks(), 3);
        thread::sleep(Duration::from_millis(40));
        for task in tasks {
            task.cancel();
        }

        let seen = seen.lock();
        for n in 0..3 {
            assert!(seen.iter().any(|(task, _)| *task == n), "task {n} never ticked");
        }
        let first = seen[0].1;
        assert!(seen.iter().all(|(_, id)| *id == first));
        assert_ne!(first, thread::current().id());
    }

    #[test]
    fn thread_exits_when_idle_and_restarts() {
        let ticker = FrameTicker::new(Duration::from_millis(2));
        let task = ticker.schedule(Arc::new(|| {})).unwrap();
        assert!(ticker.is_running());
        task.cancel();
        assert_eq!(ticker.active_tasks(), 0);

        thread::sleep(Duration::from_millis(30));
        assert!(!ticker.is_running());

        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _task = ticker
            .schedule(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn tick_may_cancel_its_own_task() {
        let ticker = FrameTicker::new(Duration::from_millis(2));
        let slot: Arc<Mutex<Option<Box<dyn FrameTask>>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));

        let inner_slot = Arc::clone(&slot);
        let counter = Arc::clone(&count);
        // Held until the task is stored so the first tick finds it
        let mut guard = slot.lock();
        let task = ticker
            .schedule(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(task) = inner_slot.lock().take() {
                    task.cancel();
                }
            }))
            .unwrap();
        *guard = Some(task);
        drop(guard);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(ticker.active_tasks(), 0);
    }

    #[test]
    fn rate_sets_interval() {
        assert_eq!(FrameTicker::with_rate(50).interval(), Duration::from_millis(20));
        assert_eq!(FrameTicker::with_rate(0).interval(), Duration::from_secs(1));
    }
}
