/// Elapsed-time counter for a session.
///
/// `start` and `stop` are idempotent because pause, modal-open and teardown
/// may all call them without coordination. Stopping never clears the counter;
/// only `reset` does, and only session teardown calls it. Methods take an
/// explicit `now_ms` so callers share one clock read per transition.
#[derive(Clone, Debug, Default)]
pub struct TimerManager {
    accumulated_ms: u64,
    running_since_ms: Option<u64>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter pre-loaded for a resumed session.
    pub fn seeded(elapsed_ms: u64) -> Self {
        Self {
            accumulated_ms: elapsed_ms,
            running_since_ms: None,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.running_since_ms.is_none() {
            self.running_since_ms = Some(now_ms);
        }
    }

    pub fn stop(&mut self, now_ms: u64) {
        if let Some(since_ms) = self.running_since_ms.take() {
            self.accumulated_ms = self
                .accumulated_ms
                .saturating_add(now_ms.saturating_sub(since_ms));
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since_ms.is_some()
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let running_ms = self
            .running_since_ms
            .map(|since_ms| now_ms.saturating_sub(since_ms))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(running_ms)
    }

    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1_000
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0;
        self.running_since_ms = None;
    }
}
