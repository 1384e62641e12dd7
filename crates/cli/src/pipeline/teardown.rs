//! Restore hooks run on every exit path.

use tracing::debug;

type Hook = Box<dyn FnOnce() + Send>;

/// Runs registered hooks (last registered first) when dropped
///
/// Drop covers normal return, `?` early exits and panic unwinding alike.
#[derive(Default)]
pub struct TeardownGuard {
    hooks: Vec<(&'static str, Hook)>,
}

impl TeardownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, hook: impl FnOnce() + Send + 'static) {
        self.hooks.push((name, Box::new(hook)));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run all hooks now; later drop is a no-op
    pub fn run(&mut self) {
        while let Some((name, hook)) = self.hooks.pop() {
            debug!(hook = name, "running restore hook");
            hook();
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.run();
    }
}
