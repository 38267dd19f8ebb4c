//! Chart raster capture.

use async_trait::async_trait;
use thiserror::Error;

use crate::chart::{ChartModel, HighlightOverlay};

/// Chart capture errors. Recovered by the exporter as a placeholder line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("No chart renderer available")]
    Unavailable,

    #[error("Chart capture failed: {0}")]
    Capture(String),
}

/// Captured chart raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    /// PNG-encoded image
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ChartImage {
    /// Height in mm when drawn `width_mm` wide, keeping the aspect ratio.
    pub fn height_for_width(&self, width_mm: f32) -> f32 {
        if self.width_px == 0 {
            return 0.0;
        }
        width_mm * self.height_px as f32 / self.width_px as f32
    }
}

/// Renders the chart, with the overlay applied, to a raster image.
///
/// Called once per export. Implementations must not keep the overlay
/// applied after returning.
#[async_trait]
pub trait ChartSnapshotter: Send + Sync {
    async fn snapshot(
        &self,
        chart: &ChartModel,
        overlay: &HighlightOverlay,
    ) -> Result<ChartImage, SnapshotError>;
}

/// Snapshotter for hosts without a renderer. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSnapshotter;

#[async_trait]
impl ChartSnapshotter for UnavailableSnapshotter {
    async fn snapshot(
        &self,
        _chart: &ChartModel,
        _overlay: &HighlightOverlay,
    ) -> Result<ChartImage, SnapshotError> {
        Err(SnapshotError::Unavailable)
    }
}
