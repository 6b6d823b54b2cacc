use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-slot guard for in-flight moves.
///
/// At most one `MovePermit` is live at a time; the slot reopens when the
/// permit drops, so release is guaranteed on every exit path of a move,
/// including errors and timeouts. While the gate is blocked (paused session
/// or open modal) no permit is handed out at all.
#[derive(Clone, Debug, Default)]
pub struct MoveGate {
    inner: Arc<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    locked: AtomicBool,
    blocked: AtomicBool,
}

pub struct MovePermit {
    inner: Arc<GateInner>,
}

impl MoveGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_enter(&self) -> Option<MovePermit> {
        if self.inner.blocked.load(Ordering::Acquire) {
            return None;
        }
        let acquired = self
            .inner
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if acquired {
            Some(MovePermit {
                inner: Arc::clone(&self.inner),
            })
        } else {
            None
        }
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }

    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.load(Ordering::Acquire)
    }
}

impl Drop for MovePermit {
    fn drop(&mut self) {
        self.inner.locked.store(false, Ordering::Release);
    }
}
