use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Supplies frame timestamps in milliseconds. Timestamps never go down.
pub trait FrameClock {
    /// Blocks until the next frame is due and returns its timestamp.
    fn next_frame(&mut self) -> f64;
}

/// Wall clock paced to a target frame rate.
pub struct PacedClock {
    origin: Instant,
    frame_dt: Duration,
    next_due: Instant,
}

impl PacedClock {
    pub fn new(fps: u32) -> Self {
        let fps = fps.clamp(1, 1000);
        let now = Instant::now();
        Self {
            origin: now,
            frame_dt: Duration::from_secs_f64(1.0 / fps as f64),
            next_due: now,
        }
    }
}

impl FrameClock for PacedClock {
    fn next_frame(&mut self) -> f64 {
        spin_sleep_until(self.next_due);
        let now = Instant::now();
        // don't try to catch up on frames lost to a stall
        self.next_due = (self.next_due + self.frame_dt).max(now);
        now.duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

/// Deterministic clock: `start`, `start + step`, `start + 2*step`, ...
pub struct FixedClock {
    next: f64,
    step_ms: f64,
}

impl FixedClock {
    pub fn new(start_ms: f64, step_ms: f64) -> Self {
        Self {
            next: start_ms,
            step_ms: step_ms.max(0.0),
        }
    }

    /// 60 frames per second starting at zero.
    pub fn sixty_fps() -> Self {
        Self::new(0.0, 1000.0 / 60.0)
    }
}

impl FrameClock for FixedClock {
    fn next_frame(&mut self) -> f64 {
        let t = self.next;
        self.next += self.step_ms;
        t
    }
}

/// Cancels a running [`FrameScheduler`]. Cloneable; stopping is idempotent.
#[derive(Clone, Debug)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Calls a frame function once per clock tick until stopped.
pub struct FrameScheduler<C> {
    clock: C,
    stopped: Arc<AtomicBool>,
    frames: u64,
}

impl<C: FrameClock> FrameScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            stopped: Arc::new(AtomicBool::new(true)),
            frames: 0,
        }
    }

    /// Arms the scheduler and returns the handle that stops it.
    pub fn start(&mut self) -> StopHandle {
        self.stopped.store(false, Ordering::Relaxed);
        StopHandle {
            stopped: Arc::clone(&self.stopped),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Relaxed)
    }

    /// Frames run so far, across all `run*` calls.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs until stopped. A frame that returns an error stops the loop and
    /// the error is handed back.
    pub fn run<E, F>(&mut self, frame: F) -> Result<u64, E>
    where
        F: FnMut(f64) -> Result<(), E>,
    {
        self.run_inner(None, frame)
    }

    /// Runs at most `n` frames, fewer if stopped.
    pub fn run_frames<E, F>(&mut self, n: u64, frame: F) -> Result<u64, E>
    where
        F: FnMut(f64) -> Result<(), E>,
    {
        self.run_inner(Some(n), frame)
    }

    fn run_inner<E, F>(&mut self, limit: Option<u64>, mut frame: F) -> Result<u64, E>
    where
        F: FnMut(f64) -> Result<(), E>,
    {
        let mut ran = 0u64;
        while self.is_running() && limit.map_or(true, |n| ran < n) {
            let t = self.clock.next_frame();
            let res = frame(t);
            ran += 1;
            self.frames += 1;
            if let Err(e) = res {
                self.stopped.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }
        Ok(ran)
    }
}

fn spin_sleep_until(end: Instant) {
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
