//! Host-side frame model: caps, buffers, and metadata.

use std::fmt;
use std::ops::BitOr;

use lumen_engine::coords::PixelSize;
use lumen_engine::device::{SyncPoint, Texture};
use lumen_engine::time::ClockTime;

// ── caps ──────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    /// Premultiplied RGBA8, one GPU texture per frame.
    #[default]
    Rgba,
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoFormat::Rgba => f.write_str("RGBA"),
        }
    }
}

/// Negotiated stream capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCaps {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    /// `(numerator, denominator)` frames per second.
    pub framerate: Option<(u32, u32)>,
}

impl VideoCaps {
    pub fn new(width: u32, height: u32) -> Self {
        Self { format: VideoFormat::Rgba, width, height, framerate: None }
    }

    pub fn with_framerate(mut self, num: u32, den: u32) -> Self {
        self.framerate = Some((num, den));
        self
    }

    #[inline]
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Duration of one frame, when the framerate is known and non-zero.
    pub fn frame_duration(&self) -> Option<ClockTime> {
        match self.framerate {
            Some((num, den)) if num > 0 => Some(ClockTime::for_frame(1, num, den)),
            _ => None,
        }
    }
}

impl fmt::Display for VideoCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{}", self.format, self.width, self.height)?;
        if let Some((num, den)) = self.framerate {
            write!(f, " @ {num}/{den}")?;
        }
        Ok(())
    }
}

// ── metadata ──────────────────────────────────────────────────────────────

/// Layout of the frame's memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoMeta {
    pub format: VideoFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row of the tightly packed layout.
    pub stride: u32,
}

impl VideoMeta {
    pub fn new(format: VideoFormat, width: u32, height: u32) -> Self {
        Self { format, width, height, stride: width.saturating_mul(4) }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct FrameFlags(u32);

impl FrameFlags {
    pub const NONE: Self = Self(0);
    /// First frame after a discontinuity (seek, flush).
    pub const DISCONT: Self = Self(1 << 0);
    /// Cannot be decoded independently.
    pub const DELTA_UNIT: Self = Self(1 << 1);
    /// Carries no real content.
    pub const GAP: Self = Self(1 << 2);
    pub const MARKER: Self = Self(1 << 3);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for FrameFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Whether a custom meta survives a transform into a new buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MetaScope {
    /// Describes the content (captions, region of interest); copied.
    Content,
    /// Describes the input's memory layout; dropped on transform.
    Memory,
}

/// Opaque host metadata attached to a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMeta {
    pub name: String,
    pub value: String,
    pub scope: MetaScope,
}

impl CustomMeta {
    pub fn content(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), scope: MetaScope::Content }
    }

    pub fn memory(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), scope: MetaScope::Memory }
    }
}

// ── buffer ────────────────────────────────────────────────────────────────

/// A video frame travelling through the host pipeline.
///
/// Memories are texture handles: cloning a buffer references the same GPU
/// allocations.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    memories: Vec<Texture>,

    pub pts: Option<ClockTime>,
    pub dts: Option<ClockTime>,
    pub duration: Option<ClockTime>,
    pub offset: Option<u64>,
    pub offset_end: Option<u64>,
    pub flags: FrameFlags,

    video_meta: Option<VideoMeta>,
    sync_point: Option<SyncPoint>,
    metas: Vec<CustomMeta>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-memory buffer wrapping `texture`.
    pub fn from_texture(texture: Texture) -> Self {
        Self { memories: vec![texture], ..Self::default() }
    }

    pub fn with_pts(mut self, pts: ClockTime) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn append_memory(&mut self, texture: Texture) {
        self.memories.push(texture);
    }

    pub fn memories(&self) -> &[Texture] {
        &self.memories
    }

    pub fn memory(&self, index: usize) -> Option<&Texture> {
        self.memories.get(index)
    }

    pub fn n_memory(&self) -> usize {
        self.memories.len()
    }

    pub fn video_meta(&self) -> Option<&VideoMeta> {
        self.video_meta.as_ref()
    }

    pub fn set_video_meta(&mut self, meta: VideoMeta) {
        self.video_meta = Some(meta);
    }

    /// Fence a consumer waits on before reading the memories.
    pub fn sync_point(&self) -> Option<&SyncPoint> {
        self.sync_point.as_ref()
    }

    pub fn set_sync_point(&mut self, sync: SyncPoint) {
        self.sync_point = Some(sync);
    }

    pub fn add_meta(&mut self, meta: CustomMeta) {
        self.metas.push(meta);
    }

    pub fn metas(&self) -> &[CustomMeta] {
        &self.metas
    }

    pub fn meta(&self, name: &str) -> Option<&CustomMeta> {
        self.metas.iter().find(|m| m.name == name)
    }
}

/// Copies timestamps, offsets, flags, and content metas from `from` to `to`.
///
/// Memories, the video meta, the sync point, and memory-scoped metas stay
/// with their own buffer.
pub fn copy_metadata(from: &FrameBuffer, to: &mut FrameBuffer) {
    to.pts = from.pts;
    to.dts = from.dts;
    to.duration = from.duration;
    to.offset = from.offset;
    to.offset_end = from.offset_end;
    to.flags = from.flags;

    to.metas.extend(from.metas.iter().filter(|m| m.scope == MetaScope::Content).cloned());
}
