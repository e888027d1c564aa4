use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use archive::IndexFilter;
use clap::{Args, ValueEnum};
use tracing::{error, info, warn};
use utils::{DataType, OutputPolicy};
use wem::process::{ogg_regrain, wem_to_ogg};
use wem::{ConvertOptions, HeaderMode, LibraryCache, PacketFormatOverride};

use crate::report::RunStats;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketMode {
    /// Decide from the vorb chunk
    #[default]
    Auto,
    /// Audio packets carry no type bit or window flags
    Modified,
    /// Audio packets are standard Vorbis packets
    Standard,
}

impl From<PacketMode> for PacketFormatOverride {
    fn from(mode: PacketMode) -> Self {
        match mode {
            PacketMode::Auto => PacketFormatOverride::Auto,
            PacketMode::Modified => PacketFormatOverride::ForceModPackets,
            PacketMode::Standard => PacketFormatOverride::ForceStandardPackets,
        }
    }
}

/// Options for turning WWRIFF audio into Ogg/Vorbis.
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Codebook library (.bin or .ocbl); repeat to load several
    #[arg(short, long, value_name = "PATH")]
    pub codebooks: Vec<PathBuf>,
    /// Which of the --codebooks libraries the inputs reference
    #[arg(short = 'l', long, value_name = "INDEX", default_value_t = 0)]
    pub library_index: usize,
    /// Codebooks are stored in the setup header, ignore --codebooks
    #[arg(long)]
    pub inline: bool,
    /// The setup headers were stripped by the encoder
    #[arg(long)]
    pub stripped: bool,
    /// Audio packet framing
    #[arg(long, value_enum, default_value_t = PacketMode::Auto)]
    pub packets: PacketMode,
    /// Write SourceFile= and OutputFile= comments into rebuilt headers
    #[arg(long)]
    pub comments: bool,
}

/// Everything shared between the items of one run.
pub struct RunContext {
    pub policy: OutputPolicy,
    pub convert: ConvertArgs,
    pub stats: RunStats,
    libraries: LibraryCache,
}

impl RunContext {
    pub fn new(policy: OutputPolicy, convert: ConvertArgs) -> Self {
        Self {
            policy,
            convert,
            stats: RunStats::default(),
            libraries: LibraryCache::new(),
        }
    }

    fn options(&mut self) -> Result<ConvertOptions> {
        let mut options = ConvertOptions::new()
            .with_stripped(self.convert.stripped)
            .with_packet_format(self.convert.packets.into())
            .with_comments(self.convert.comments);
        if self.convert.inline || self.convert.codebooks.is_empty() {
            return Ok(options);
        }

        let index = self.convert.library_index;
        let path = self.convert.codebooks.get(index).ok_or_else(|| {
            anyhow!(
                "library index {index} out of range, {} codebook libraries given",
                self.convert.codebooks.len()
            )
        })?;
        let library = self.libraries.get_or_load(path).map_err(|message| anyhow!(message))?;
        options = options.with_library(library);
        Ok(options)
    }

    fn count_headers(&mut self, mode: Option<HeaderMode>) {
        match mode {
            Some(HeaderMode::Rebuilt) => self.stats.headers_rebuilt += 1,
            Some(HeaderMode::Copied) => self.stats.headers_copied += 1,
            None => {}
        }
    }

    /// Run one item, log its failure and count it.
    fn track(&mut self, kind: DataType, input: &Path, run: impl FnOnce(&mut Self) -> Result<()>) {
        self.stats.assign(kind);
        let result = run(self);
        if let Err(err) = &result {
            error!("{}: {err:#}", input.display());
        }
        self.stats.record(kind, result.is_ok());
    }

    pub fn convert_wem(&mut self, input: &Path, output: Option<&Path>) {
        self.track(DataType::Wem, input, |ctx| {
            let options = ctx.options()?;
            let outcome = wem_to_ogg(input, output, &options, ctx.policy)?;
            ctx.count_headers(outcome.header_mode);
            Ok(())
        });
    }

    pub fn regrain(&mut self, input: &Path, output: Option<&Path>) {
        self.track(DataType::Ogg, input, |ctx| {
            ogg_regrain(input, output, ctx.policy)?;
            Ok(())
        });
    }

    pub fn extract_archive(&mut self, kind: DataType, input: &Path, filter: &IndexFilter) {
        self.track(kind, input, |ctx| {
            let outcome = archive::process::extract(input, filter, ctx.policy)?;
            ctx.stats.extracted += outcome.succeeded;
            ctx.stats.item_failures += outcome.failed;
            Ok(())
        });
    }

    pub fn convert_archive(&mut self, kind: DataType, input: &Path, filter: &IndexFilter) {
        self.track(kind, input, |ctx| {
            if ctx.policy.in_place {
                warn!("--in-place has no effect on archives");
            }
            let options = ctx.options()?;
            let outcome = archive::process::convert(input, filter, &options, ctx.policy)?;
            ctx.stats.converted += outcome.succeeded;
            ctx.stats.item_failures += outcome.failed;
            ctx.stats.headers_rebuilt += outcome.headers_rebuilt;
            ctx.stats.headers_copied += outcome.headers_copied;
            Ok(())
        });
    }

    /// Detect the type of `input` (unless `hint` names one) and run the
    /// default action for it.
    pub fn dispatch(&mut self, input: &Path, hint: Option<DataType>, filter: &IndexFilter) {
        let kind = match hint {
            Some(kind) => Some(kind),
            None => detect(input),
        };
        match kind {
            Some(DataType::Ogg) => self.regrain(input, None),
            Some(DataType::Wem) => self.convert_wem(input, None),
            Some(kind @ (DataType::Wsp | DataType::Bnk)) => self.convert_archive(kind, input, filter),
            None => {
                error!("{}: unknown data type, skipping", input.display());
                self.stats.unknown += 1;
            }
        }
    }

    pub fn finish(&self) {
        info!(
            "Run complete: {} failures, {} archive item failures",
            self.stats.failed(),
            self.stats.item_failures
        );
    }
}

fn detect(input: &Path) -> Option<DataType> {
    let mut head = [0u8; 4];
    let read = File::open(input).and_then(|mut file| file.read(&mut head));
    match read {
        Ok(n) => DataType::detect(input, &head[..n]),
        Err(err) => {
            warn!("{}: {err}, guessing from the extension", input.display());
            DataType::from_extension(input)
        }
    }
}
