use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};
use utils::{OutputPolicy, indexed_output_path};
use wem::{ConvertOptions, HeaderMode, convert_bytes};

use crate::error::ArchiveError;
use crate::scanner::scan;
use crate::types::{ArchiveScan, IndexFilter, RiffGeometry};

/// Counters for one archive run.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub found: usize,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub headers_rebuilt: usize,
    pub headers_copied: usize,
    pub truncated: bool,
    pub outputs: Vec<PathBuf>,
}

fn load(input: &Path) -> Result<(Vec<u8>, ArchiveScan)> {
    let buffer = fs::read(input).with_context(|| format!("Failed to read {input:?}"))?;
    let scan = scan(&buffer);
    info!(
        "Found {} RIFF blobs in {:?}{}",
        scan.items.len(),
        input,
        if scan.truncated.is_some() { " (truncated)" } else { "" }
    );
    Ok((buffer, scan))
}

/// Items that pass `filter`, with their index.
fn selected<'a>(
    scan: &'a ArchiveScan,
    filter: &'a IndexFilter,
) -> impl Iterator<Item = (u32, &'a RiffGeometry)> + 'a {
    scan.items
        .iter()
        .enumerate()
        .map(|(index, geometry)| (index as u32, geometry))
        .filter(|(index, _)| filter.passes(*index))
}

fn copy_item(buffer: &[u8], geometry: &RiffGeometry) -> crate::Result<Vec<u8>> {
    let bytes = geometry.slice(buffer).unwrap_or_default();
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(out)
}

fn write_item(path: &Path, bytes: &[u8], policy: OutputPolicy) -> crate::Result<()> {
    if policy.dry_run {
        info!("Dry run, not writing {:?} ({} bytes)", path, bytes.len());
        return Ok(());
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Write every selected blob of `input` as `<stem>_<index>.wem`.
pub fn extract(input: &Path, filter: &IndexFilter, policy: OutputPolicy) -> Result<ArchiveOutcome> {
    let (buffer, scan) = load(input)?;
    let mut outcome = ArchiveOutcome {
        found: scan.items.len(),
        truncated: scan.truncated.is_some(),
        ..Default::default()
    };

    for (index, geometry) in selected(&scan, filter) {
        outcome.selected += 1;
        let path = indexed_output_path(input, index as usize, scan.items.len(), "wem");
        match copy_item(&buffer, geometry).and_then(|bytes| write_item(&path, &bytes, policy)) {
            Ok(()) => {
                info!("Extracted item {index} -> {:?}", path);
                outcome.succeeded += 1;
                outcome.outputs.push(path);
            }
            Err(err) => {
                error!("Item {index} of {:?}: {err}", input);
                outcome.failed += 1;
            }
        }
    }
    Ok(outcome)
}

/// Convert every selected blob of `input` to `<stem>_<index>.ogg`.
pub fn convert(
    input: &Path,
    filter: &IndexFilter,
    options: &ConvertOptions,
    policy: OutputPolicy,
) -> Result<ArchiveOutcome> {
    let (buffer, scan) = load(input)?;
    let mut outcome = ArchiveOutcome {
        found: scan.items.len(),
        truncated: scan.truncated.is_some(),
        ..Default::default()
    };

    for (index, geometry) in selected(&scan, filter) {
        outcome.selected += 1;
        let path = indexed_output_path(input, index as usize, scan.items.len(), "ogg");
        let mut item_options = options.clone();
        item_options.source_name = Some(input.display().to_string());
        item_options.output_name = Some(path.display().to_string());

        let converted = convert_item(&buffer, geometry, index, &item_options).and_then(|(mode, ogg)| {
            write_item(&path, &ogg, policy)?;
            Ok(mode)
        });
        match converted {
            Ok(mode) => {
                info!("Converted item {index} -> {:?} ({:?} headers)", path, mode);
                outcome.succeeded += 1;
                match mode {
                    HeaderMode::Rebuilt => outcome.headers_rebuilt += 1,
                    HeaderMode::Copied => outcome.headers_copied += 1,
                }
                outcome.outputs.push(path);
            }
            Err(err) => {
                error!("Item {index} of {:?}: {err}", input);
                outcome.failed += 1;
            }
        }
    }
    Ok(outcome)
}

fn convert_item(
    buffer: &[u8],
    geometry: &RiffGeometry,
    index: u32,
    options: &ConvertOptions,
) -> crate::Result<(HeaderMode, Vec<u8>)> {
    let bytes = geometry.slice(buffer).unwrap_or_default();
    let stream = convert_bytes(bytes, options).map_err(|source| ArchiveError::Item { index, source })?;
    let ogg = stream
        .to_ogg_bytes()
        .map_err(|source| ArchiveError::Item { index, source })?;
    Ok((stream.header_mode, ogg))
}

/// The scan of `input` as pretty JSON.
pub fn list(input: &Path) -> Result<String> {
    let (_, scan) = load(input)?;
    let json = serde_json::to_string_pretty(&scan).map_err(ArchiveError::Json)?;
    Ok(json)
}
