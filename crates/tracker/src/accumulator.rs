//! Sub-unit remainder accumulator
//!
//! 把小于 1 的浮点位移累积起来，只输出整数部分 (向零截断)，余量留待下次。
//! Invariant: `|remainder| < 1` on both axes after every [`Accumulator::push`],
//! and the sum of everything emitted plus the remainder equals the sum of
//! everything pushed.

/// Fractional displacement bank
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    rx: f64,
    ry: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw displacement and extract its whole part
    ///
    /// Non-finite inputs are dropped so the invariant survives a bad frame.
    pub fn push(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        (extract(&mut self.rx, dx), extract(&mut self.ry, dy))
    }

    pub fn remainder(&self) -> (f64, f64) {
        (self.rx, self.ry)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[inline]
fn extract(bank: &mut f64, delta: f64) -> f64 {
    if !delta.is_finite() {
        return 0.0;
    }
    *bank += delta;
    let whole = bank.trunc();
    *bank -= whole;
    whole
}
