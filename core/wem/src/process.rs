use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use utils::{OutputPolicy, with_suffix};

use crate::regrain::regrain_bytes;
use crate::stream::HeaderMode;
use crate::transcoder::{ConvertOptions, convert_bytes};

/// What a driver produced for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub output: PathBuf,
    /// Only set by WWRIFF conversions.
    pub header_mode: Option<HeaderMode>,
    pub audio_packets: usize,
    pub final_granule: u64,
    pub written: bool,
}

fn write_output(path: &Path, bytes: &[u8], policy: OutputPolicy) -> Result<bool> {
    if policy.dry_run {
        info!("Dry run, not writing {:?} ({} bytes)", path, bytes.len());
        return Ok(false);
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {path:?}"))?;
    Ok(true)
}

/// Convert one WEM file to Ogg/Vorbis. Writes `<stem>.ogg`, `output` if
/// given, or replaces the input.
pub fn wem_to_ogg(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
    policy: OutputPolicy,
) -> Result<ItemOutcome> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {input:?}"))?;

    let out_path = match (output, policy.in_place) {
        (Some(path), _) => path.to_path_buf(),
        (None, true) => input.to_path_buf(),
        (None, false) => with_suffix(input, "", "ogg"),
    };

    let mut options = options.clone();
    if options.source_name.is_none() {
        options.source_name = Some(input.display().to_string());
    }
    if options.output_name.is_none() {
        options.output_name = Some(out_path.display().to_string());
    }

    let stream = convert_bytes(&bytes, &options).with_context(|| format!("Failed to convert {input:?}"))?;
    let ogg = stream.to_ogg_bytes()?;

    info!(
        "Converted {:?} -> {:?} ({:?} headers, {} packets, {} samples)",
        input,
        out_path,
        stream.header_mode,
        stream.packets.len(),
        stream.final_granule()
    );
    let written = write_output(&out_path, &ogg, policy)?;

    Ok(ItemOutcome {
        output: out_path,
        header_mode: Some(stream.header_mode),
        audio_packets: stream.packets.len(),
        final_granule: stream.final_granule(),
        written,
    })
}

/// Recompute granule positions of an Ogg/Vorbis file. Writes
/// `<stem>_rvb.ogg` unless replacing the input.
pub fn ogg_regrain(input: &Path, output: Option<&Path>, policy: OutputPolicy) -> Result<ItemOutcome> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {input:?}"))?;
    let (ogg, summary) = regrain_bytes(&bytes).with_context(|| format!("Failed to regranularize {input:?}"))?;

    let out_path = match (output, policy.in_place) {
        (Some(path), _) => path.to_path_buf(),
        (None, true) => input.to_path_buf(),
        (None, false) => with_suffix(input, "_rvb", "ogg"),
    };
    info!(
        "Regranularized {:?} -> {:?} (stream {:#010x}, {} packets, {} samples)",
        input, out_path, summary.serial, summary.audio_packets, summary.final_granule
    );
    let written = write_output(&out_path, &ogg, policy)?;

    Ok(ItemOutcome {
        output: out_path,
        header_mode: None,
        audio_packets: summary.audio_packets,
        final_granule: summary.final_granule,
        written,
    })
}
