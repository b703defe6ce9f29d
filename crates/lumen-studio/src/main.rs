use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::Parser;

use lumen_engine::coords::PixelSize;
use lumen_engine::device::{ContextBinding, GpuInit};
use lumen_engine::logging::{LoggingConfig, init_logging};
use lumen_engine::paint::Color;
use lumen_engine::time::ClockTime;
use lumen_overlay::{FrameBuffer, OverlayCompositor, OverlayConfig, VideoCaps};

/// Renders an overlay scene over a generated test pattern.
#[derive(Parser, Debug)]
#[command(name = "lumen-studio", version)]
struct Cli {
    /// Scene file (.lml). Imports resolve relative to its directory.
    scene: PathBuf,

    /// Output directory for frame_NNNN.png files.
    #[arg(long, default_value = "frames")]
    out: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Number of frames to render.
    #[arg(long, default_value_t = 30)]
    frames: u64,

    /// Frames per second of the synthetic stream.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Render on a headless wgpu adapter instead of the software device.
    #[arg(long)]
    gpu: bool,

    /// Clear color as #rrggbb[aa] or a color name.
    #[arg(long)]
    clear: Option<String>,

    /// Log filter, e.g. "debug" or "lumen_overlay=trace".
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig { env_filter: cli.log.clone(), ..LoggingConfig::default() });

    let src = fs::read_to_string(&cli.scene)
        .with_context(|| format!("read scene '{}'", cli.scene.display()))?;
    let clear_color = match cli.clear.as_deref() {
        Some(text) => parse_color(text)?,
        None => Color::TRANSPARENT,
    };

    let context = if cli.gpu {
        ContextBinding::wgpu(GpuInit::default()).context("create wgpu context")?
    } else {
        ContextBinding::software()
    };

    let mut overlay = OverlayCompositor::new(OverlayConfig {
        clear_color,
        ..OverlayConfig::with_scene(src.clone())
    });
    register_imports(&mut overlay, &src, cli.scene.parent().unwrap_or_else(|| Path::new(".")))?;
    overlay.on_scene_initialized(|root| log::info!("scene initialized, root {root:?}"));

    overlay.start(&context)?;
    let caps = VideoCaps::new(cli.width, cli.height).with_framerate(cli.fps, 1);
    overlay.set_caps(caps.clone(), caps.clone())?;

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("create output dir '{}'", cli.out.display()))?;

    for index in 0..cli.frames {
        let input = test_pattern(&context, caps.size(), index, cli.fps)?;
        let output = overlay.process_frame(&input)?;
        if let Some(sync) = output.sync_point() {
            sync.wait()?;
        }

        let path = cli.out.join(format!("frame_{index:04}.png"));
        write_png(&context, &output, &path)?;
        log::debug!("wrote {}", path.display());
    }

    overlay.stop()?;
    log::info!("rendered {} frames into '{}'", cli.frames, cli.out.display());
    Ok(())
}

/// Registers every `import "path" as Alias` of the scene, reading the
/// component files next to the scene.
fn register_imports(overlay: &mut OverlayCompositor, src: &str, dir: &Path) -> Result<()> {
    let doc = lumen_markup::parse_str(src).map_err(|e| anyhow::anyhow!("parse scene:\n{}", e.snippet(src)))?;
    for import in &doc.imports {
        let path = dir.join(&import.path);
        let component = fs::read_to_string(&path)
            .with_context(|| format!("read component '{}'", path.display()))?;
        overlay.register_component(&import.alias, &component)?;
        log::debug!("registered component {} from {}", import.alias, path.display());
    }
    Ok(())
}

fn parse_color(text: &str) -> Result<Color> {
    let parsed = match text.strip_prefix('#') {
        Some(hex) => lumen_markup::lexer::parse_hex_color(hex).map(Color::from_rgba8),
        None => Color::from_name(text),
    };
    match parsed {
        Some(c) => Ok(c),
        None => bail!("invalid color '{text}'"),
    }
}

/// Opaque gradient that drifts one step per frame.
fn test_pattern(context: &ContextBinding, size: PixelSize, index: u64, fps: u32) -> Result<FrameBuffer> {
    let shift = (index * 4 % 256) as u32;
    let mut texels = Vec::with_capacity(size.rgba_len());
    for y in 0..size.height {
        for x in 0..size.width {
            let r = (x * 255 / size.width.max(1) + shift) % 256;
            let g = y * 255 / size.height.max(1);
            texels.extend_from_slice(&[r as u8, g as u8, 96, 255]);
        }
    }

    let cx = context.make_current()?;
    let mut frame = FrameBuffer::from_texture(cx.upload_rgba(size, &texels)?);
    frame.pts = Some(ClockTime::for_frame(index, fps, 1));
    frame.duration = Some(ClockTime::for_frame(1, fps, 1));
    frame.offset = Some(index);
    Ok(frame)
}

fn write_png(context: &ContextBinding, frame: &FrameBuffer, path: &Path) -> Result<()> {
    let Some(texture) = frame.memory(0) else {
        bail!("output frame has no memory");
    };
    let mut rgba = context.make_current()?.read_pixels(texture)?;

    // PNG stores straight alpha.
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a > 0 && a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
            }
        }
    }

    image::save_buffer_with_format(
        path,
        &rgba,
        texture.width(),
        texture.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write '{}'", path.display()))
}
