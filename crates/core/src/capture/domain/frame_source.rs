use std::path::Path;
use std::time::Duration;

use crate::capture::domain::sample_buffer::SampleBuffer;
use crate::error::AnalysisError;

/// Properties of an opened source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    pub total_samples: usize,
    pub fps: f64,
}

/// Push-style capture source: yields timestamped samples in delivery order.
pub trait FrameSource: Send {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, AnalysisError>;

    fn samples(&mut self) -> Box<dyn Iterator<Item = (SampleBuffer, Duration)> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
