use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use utils::DataType;

use crate::commands::archive::FilterArgs;
use crate::context::{ConvertArgs, RunContext};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeHint {
    #[default]
    Auto,
    Ogg,
    Wem,
    Wsp,
    Bnk,
}

impl TypeHint {
    fn data_type(self) -> Option<DataType> {
        match self {
            TypeHint::Auto => None,
            TypeHint::Ogg => Some(DataType::Ogg),
            TypeHint::Wem => Some(DataType::Wem),
            TypeHint::Wsp => Some(DataType::Wsp),
            TypeHint::Bnk => Some(DataType::Bnk),
        }
    }
}

#[derive(Args)]
pub struct AutoArgs {
    /// Input files of any supported type
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Treat every input as this type instead of detecting it
    #[arg(short = 't', long = "type", value_enum, default_value_t = TypeHint::Auto)]
    pub kind: TypeHint,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub convert: ConvertArgs,
}

/// Regranularize Ogg files, convert WEMs and convert archive contents.
pub fn handle(args: AutoArgs, ctx: &mut RunContext) -> Result<()> {
    let filter = args.filter.to_filter();
    ctx.convert = args.convert;
    for input in &args.inputs {
        ctx.dispatch(input, args.kind.data_type(), &filter);
    }
    Ok(())
}
