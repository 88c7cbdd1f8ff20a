//! Application runner - entry point for the CLI binary.

use anyhow::{Context, Result};
use log::{info, trace};

use crate::cli::Args;
use crate::config::RenderConfig;
use crate::core::runner::render_sequence;
use crate::entities::effects::{create, Effect, EffectType};

/// Run one render with the given arguments.
///
/// # Returns
/// * `Ok(())` after all frames rendered (and written, with `--out`)
/// * `Err` on bad config, unreadable sprite or failed frame write
pub fn run_app(args: Args) -> Result<()> {
    info!("maskfx {} starting", env!("CARGO_PKG_VERSION"));
    trace!("Command-line args: {:?}", args);

    if args.list_effects {
        for t in EffectType::all() {
            println!("{}", t.display_name());
        }
        return Ok(());
    }

    let mut config = RenderConfig::resolve(args.config.clone())?;
    config.apply_args(&args)?;
    trace!("Render config: {:?}", config);

    let effect_type = config.effect_type()?;
    let scene = config.build_scene();
    let sprite = config.load_sprite()?;
    let mut effect = create(effect_type, &config.settings, sprite)
        .with_context(|| format!("Failed to set up {}", effect_type))?;

    if let Some(dir) = &config.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        info!("Output: {}", dir.display());
    } else {
        info!("No output directory, frames are rendered but not written");
    }

    info!(
        "{} at {}x{}, {} frames",
        effect.name(),
        config.width,
        config.height,
        config.frames
    );
    let stats = render_sequence(&mut effect, &scene, config.frames, config.out_dir.as_deref())
        .with_context(|| format!("{} failed", effect_type))?;

    info!("Done: {} frames, {} written", stats.frames, stats.written.len());
    Ok(())
}
