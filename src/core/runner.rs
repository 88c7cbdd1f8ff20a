//! Frame loop - drives one effect over a synthetic sequence.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use crate::entities::effects::{Effect, EffectKind};
use crate::entities::error::FxError;
use crate::entities::frame::RasterBuffer;
use crate::entities::traits::{FrameContext, Host, ObjectId};

use super::scene::SyntheticScene;

/// Outcome of a [`render_sequence`] run.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub frames: u64,
    /// PNGs written, in frame order
    pub written: Vec<PathBuf>,
    /// Output of the last frame rendered
    pub last_frame: Option<RasterBuffer>,
    /// (frame, object) pairs where a tracked object went away
    pub removed: Vec<(u64, ObjectId)>,
}

/// Output file name for a frame
pub fn frame_file_name(frame_index: u64) -> String {
    format!("frame_{:04}.png", frame_index)
}

/// Render frames `0..frames` in order, writing `frame_NNNN.png` into
/// `out_dir` when given.
///
/// Objects tracked on one frame and gone on the next are handed to
/// [`Effect::remove_object`] before that frame renders.
pub fn render_sequence(
    effect: &mut EffectKind,
    scene: &SyntheticScene,
    frames: u64,
    out_dir: Option<&Path>,
) -> Result<RenderStats, FxError> {
    info!("Rendering {} frames with {} ({})", frames, effect.name(), effect.uuid());
    let started = Instant::now();
    let mut stats = RenderStats::default();
    let mut tracked: Vec<ObjectId> = Vec::new();

    for frame in 0..frames {
        let current = scene.objects(frame);
        for &id in tracked.iter().filter(|id| !current.contains(*id)) {
            debug!("Frame {}: object {} removed", frame, id);
            effect.remove_object(id);
            stats.removed.push((frame, id));
        }
        tracked = current;

        let mut ctx = FrameContext::new(frame, scene.source_frame(frame));
        effect.render_frame(&mut ctx, scene)?;

        if let Some(dir) = out_dir {
            let path = dir.join(frame_file_name(frame));
            ctx.render_target.save_png(&path)?;
            debug!("Frame {} -> {}", frame, path.display());
            stats.written.push(path);
        }
        stats.frames += 1;
        stats.last_frame = Some(ctx.render_target);
    }

    info!(
        "Rendered {} frames in {:.1} ms",
        stats.frames,
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::link_sprite;
    use crate::entities::attrs::Attrs;
    use crate::entities::effects::{create, EffectType};
    use crate::entities::frame::PixelFormat;
    use glam::IVec2;

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(7), "frame_0007.png");
        assert_eq!(frame_file_name(12345), "frame_12345.png");
    }

    #[test]
    fn test_every_effect_renders_demo() {
        let scene = SyntheticScene::demo(96, 64);
        for &t in EffectType::all() {
            let sprite = t.needs_sprite().then(|| link_sprite(12));
            let mut fx = create(t, &Attrs::new(), sprite).unwrap();
            let stats = render_sequence(&mut fx, &scene, 3, None).unwrap();
            assert_eq!(stats.frames, 3);
            assert!(stats.written.is_empty());
            let last = stats.last_frame.unwrap();
            assert_eq!(last.resolution(), (96, 64));
            assert_eq!(last.format(), PixelFormat::Rgba8);
        }
    }

    #[test]
    fn test_departed_object_state_dropped() {
        // 4 px object stepping 10 px in a 20 px frame is gone at frame 2
        let scene = SyntheticScene::single_mover(20, 10, 4, IVec2::new(0, 3), IVec2::new(10, 0));
        let mut fx = create(EffectType::Edgy, &Attrs::new(), None).unwrap();

        let stats = render_sequence(&mut fx, &scene, 2, None).unwrap();
        assert!(stats.removed.is_empty());
        let EffectKind::Edgy(edgy) = &fx else {
            panic!("expected Edgy");
        };
        assert_eq!(edgy.trails().len(), 1);

        let stats = render_sequence(&mut fx, &scene, 4, None).unwrap();
        assert_eq!(stats.removed, vec![(2, 1)]);
        let EffectKind::Edgy(edgy) = &fx else {
            panic!("expected Edgy");
        };
        assert!(edgy.trails().is_empty());
    }

    #[test]
    fn test_writes_pngs() {
        let dir = std::env::temp_dir().join(format!("maskfx_runner_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let scene = SyntheticScene::single_mover(16, 16, 4, IVec2::new(1, 1), IVec2::new(2, 1));
        let mut fx = create(EffectType::MoTrail, &Attrs::new(), None).unwrap();
        let stats = render_sequence(&mut fx, &scene, 2, Some(&dir)).unwrap();

        assert_eq!(stats.written, vec![dir.join("frame_0000.png"), dir.join("frame_0001.png")]);
        let loaded = RasterBuffer::load(&stats.written[1]).unwrap();
        assert_eq!(Some(loaded), stats.last_frame);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
