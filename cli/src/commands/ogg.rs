use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use crate::context::RunContext;

#[derive(Args)]
pub struct OggArgs {
    /// Input Ogg/Vorbis files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output file (single input only; defaults to <stem>_rvb.ogg)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle(args: OggArgs, ctx: &mut RunContext) -> Result<()> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output needs exactly one input, got {}", args.inputs.len());
    }
    for input in &args.inputs {
        ctx.regrain(input, args.output.as_deref());
    }
    Ok(())
}
