use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archive::{FilterKind, IndexFilter};
use clap::{Args, Subcommand};
use utils::DataType;

use crate::context::{ConvertArgs, RunContext};

/// Item selection by 0-based index. The flag given last wins.
#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Only process these items (comma separated, e.g. 0,3,0x10)
    #[arg(long, value_name = "LIST", overrides_with = "deny")]
    pub allow: Option<String>,
    /// Skip these items (comma separated)
    #[arg(long, value_name = "LIST", overrides_with = "allow")]
    pub deny: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> IndexFilter {
        match (&self.allow, &self.deny) {
            (Some(list), _) => IndexFilter::parse(FilterKind::Allow, list),
            (None, Some(list)) => IndexFilter::parse(FilterKind::Deny, list),
            (None, None) => IndexFilter::default(),
        }
    }
}

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Write each embedded RIFF blob to <stem>_<index>.wem
    Extract {
        /// Input WSP/BNK files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Convert each embedded WEM to <stem>_<index>.ogg
    Convert {
        /// Input WSP/BNK files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        convert: ConvertArgs,
    },
    /// Print the embedded blobs as JSON
    List {
        /// Input WSP/BNK file
        input: PathBuf,
    },
}

fn archive_kind(input: &Path) -> DataType {
    match DataType::from_extension(input) {
        Some(DataType::Bnk) => DataType::Bnk,
        _ => DataType::Wsp,
    }
}

pub fn handle(cmd: ArchiveCommands, ctx: &mut RunContext) -> Result<()> {
    match cmd {
        ArchiveCommands::Extract { inputs, filter } => {
            let filter = filter.to_filter();
            for input in &inputs {
                ctx.extract_archive(archive_kind(input), input, &filter);
            }
        }
        ArchiveCommands::Convert {
            inputs,
            filter,
            convert,
        } => {
            let filter = filter.to_filter();
            ctx.convert = convert;
            for input in &inputs {
                ctx.convert_archive(archive_kind(input), input, &filter);
            }
        }
        ArchiveCommands::List { input } => {
            let json = archive::process::list(&input).with_context(|| format!("Failed to list {input:?}"))?;
            println!("{json}");
        }
    }
    Ok(())
}
