//! 线程间单槽交接
//!
//! - [`LatestCell`]: 只保留最新值，写入覆盖旧值
//! - [`CorrectionMailbox`]: 视觉线程写入修正量，执行线程取出并清零

use parking_lot::Mutex;

/// Single slot where the newest value wins
#[derive(Debug)]
pub struct LatestCell<T> {
    slot: Mutex<Option<T>>,
}

impl<T> LatestCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store `value`; returns `true` if an unconsumed value was overwritten
    pub fn put(&self, value: T) -> bool {
        self.slot.lock().replace(value).is_some()
    }

    /// Take the newest value, leaving the slot empty
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T> Default for LatestCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending integer displacement from the vision thread
#[derive(Debug, Default)]
pub struct CorrectionMailbox {
    slot: Mutex<(i32, i32)>,
}

impl CorrectionMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the pending displacement
    pub fn post(&self, dx: i32, dy: i32) {
        *self.slot.lock() = (dx, dy);
    }

    /// Take the pending displacement and reset it to zero
    pub fn take(&self) -> (i32, i32) {
        std::mem::take(&mut *self.slot.lock())
    }

    pub fn peek(&self) -> (i32, i32) {
        *self.slot.lock()
    }
}
