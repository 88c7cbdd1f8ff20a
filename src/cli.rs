use clap::Parser;
use std::path::PathBuf;

// Build version with backend info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Shaders: CPU reference backend\n",
    "Image:   image 0.25 (PNG, JPEG)\n",
    "Target:  ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Mask-driven video effects over a synthetic scene
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Effect to render (MoTrail, Edgy, "Go Go Gadget", Inflate, Pixelate, "Masking Tape", Eraser)
    #[arg(short = 'e', long = "effect", value_name = "NAME")]
    pub effect: Option<String>,

    /// Number of frames to render
    #[arg(short = 'n', long = "frames", value_name = "N")]
    pub frames: Option<u64>,

    /// Video resolution
    #[arg(short = 's', long = "size", value_name = "WxH", value_parser = parse_size)]
    pub size: Option<(usize, usize)>,

    /// Directory for frame_NNNN.png output (nothing is written without it)
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Render config JSON (also read from MASKFX_CONFIG)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Link template image for Go Go Gadget
    #[arg(long = "sprite", value_name = "IMAGE")]
    pub sprite: Option<PathBuf>,

    /// List available effects and exit
    #[arg(long = "list-effects")]
    pub list_effects: bool,

    /// Enable debug logging to file (default: maskfx.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Parse `WIDTHxHEIGHT` (e.g. `640x360`)
pub fn parse_size(s: &str) -> Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: usize = w.trim().parse().map_err(|_| format!("bad width in '{}'", s))?;
    let h: usize = h.trim().parse().map_err(|_| format!("bad height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got '{}'", s));
    }
    Ok((w, h))
}
