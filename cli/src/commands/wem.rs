use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use crate::context::{ConvertArgs, RunContext};

#[derive(Args)]
pub struct WemArgs {
    /// Input WEM files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output file (single input only; defaults to <stem>.ogg)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub convert: ConvertArgs,
}

pub fn handle(args: WemArgs, ctx: &mut RunContext) -> Result<()> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output needs exactly one input, got {}", args.inputs.len());
    }
    ctx.convert = args.convert;
    for input in &args.inputs {
        ctx.convert_wem(input, args.output.as_deref());
    }
    Ok(())
}
