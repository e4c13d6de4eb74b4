mod builder;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst;
mod source;
mod synthetic;

pub use builder::FrameSourceBuilder;
#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst::GstCamera;
pub use source::FrameSource;
pub use synthetic::SyntheticCamera;
