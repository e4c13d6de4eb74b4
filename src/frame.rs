use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a frame's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// JPEG stills from a v4l2 device
    Mjpeg,
    /// Packed 32-bit pixels, typical for mobile camera buffers
    Bgra32,
}

impl FrameFormat {
    /// Zero for compressed formats
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0,
            FrameFormat::Bgra32 => 4,
        }
    }

    /// Check if format is compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// How the sensor image is oriented relative to upright.
///
/// Front-facing cameras usually deliver mirrored buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

/// Owned frame snapshot handed to classifiers
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership so both stages see the same bytes)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
    /// Sensor orientation
    pub orientation: Orientation,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
            orientation: Orientation::Up,
        }
    }

    /// Byte length implied by the dimensions, `None` when compressed
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Whether the payload can be handed to a classifier at all
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => !self.data.is_empty(),
        }
    }
}

/// Callback a frame source invokes for every captured frame
pub type FrameHandler = Arc<dyn for<'a> Fn(FrameRef<'a>) + Send + Sync>;

/// Borrowed frame as delivered by a frame source callback.
///
/// The bytes belong to the capture backend and are only valid for the
/// duration of the callback; [`FrameRef::snapshot`] copies what the pipeline
/// keeps.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    pub id: u64,
    pub timestamp: SystemTime,
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
    pub orientation: Orientation,
}

impl FrameRef<'_> {
    pub fn snapshot(&self) -> FrameData {
        FrameData {
            id: self.id,
            timestamp: self.timestamp,
            data: Arc::new(self.data.to_vec()),
            width: self.width,
            height: self.height,
            format: self.format,
            orientation: self.orientation,
        }
    }
}
