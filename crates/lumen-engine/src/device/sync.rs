use std::fmt;
use std::time::Duration;

use super::BackendError;

/// GPU-timeline fence marking the completion of a render pass.
///
/// Downstream consumers call [`wait`](Self::wait) before reading the texture
/// the pass produced. Sequence numbers grow monotonically per backend.
#[derive(Clone)]
pub struct SyncPoint {
    seq: u64,
    fence: Fence,
}

#[derive(Clone)]
enum Fence {
    /// Work already finished when the point was recorded (software device).
    Signaled,
    Wgpu { device: wgpu::Device, index: wgpu::SubmissionIndex },
}

impl SyncPoint {
    pub(crate) fn signaled(seq: u64) -> Self {
        Self { seq, fence: Fence::Signaled }
    }

    pub(crate) fn wgpu(seq: u64, device: wgpu::Device, index: wgpu::SubmissionIndex) -> Self {
        Self { seq, fence: Fence::Wgpu { device, index } }
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Blocks until the GPU has passed this point.
    pub fn wait(&self) -> Result<(), BackendError> {
        match &self.fence {
            Fence::Signaled => Ok(()),
            Fence::Wgpu { device, index } => device
                .poll(wgpu::PollType::Wait { submission_index: Some(index.clone()), timeout: None })
                .map(|_| ())
                .map_err(|e| BackendError::Device(e.to_string())),
        }
    }

    /// Non-blocking check.
    pub fn is_signaled(&self) -> bool {
        match &self.fence {
            Fence::Signaled => true,
            Fence::Wgpu { device, index } => device
                .poll(wgpu::PollType::Wait {
                    submission_index: Some(index.clone()),
                    timeout: Some(Duration::ZERO),
                })
                .is_ok(),
        }
    }
}

impl fmt::Debug for SyncPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.fence {
            Fence::Signaled => "signaled",
            Fence::Wgpu { .. } => "wgpu",
        };
        f.debug_struct("SyncPoint").field("seq", &self.seq).field("fence", &kind).finish()
    }
}
