use crate::error::Result;
use crate::frame::FrameHandler;
use async_trait::async_trait;

/// Push-based frame producer.
///
/// Frames reach the handler as borrowed [`crate::frame::FrameRef`]s that are
/// only valid during the call. `start` and `stop` are idempotent.
#[async_trait]
pub trait FrameSource: Send + Sync {
    fn name(&self) -> &str;

    /// Begin delivering frames to `handler`
    async fn start(&self, handler: FrameHandler) -> Result<()>;

    /// Stop delivering frames. Frames already handed off are unaffected.
    async fn stop(&self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Frames delivered since creation
    fn frame_count(&self) -> u64;
}
