//! PerceptionAdapter trait - the external detection component
//!
//! The loop does not care what produces detections: a neural model, a
//! color-threshold detector, or a scripted replay all plug in here.

use crate::{ContractError, Detection, Frame};

/// Synchronous detector invoked once per fresh frame
pub trait PerceptionAdapter: Send {
    /// Adapter name (used for logging)
    fn name(&self) -> &str;

    /// Run detection over the frame
    ///
    /// Coordinates in the returned boxes are frame-local.
    ///
    /// # Errors
    /// A failed detection is transient; the loop logs it and treats the
    /// frame as having no detections.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ContractError>;
}

impl<P: PerceptionAdapter + ?Sized> PerceptionAdapter for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ContractError> {
        (**self).detect(frame)
    }
}
