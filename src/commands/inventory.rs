use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::model::{PageEntry, PageInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let image_dir = args
        .image_dir
        .clone()
        .unwrap_or_else(|| default_image_dir(&args.cache_root));
    let manifest = build_manifest(&image_dir)?;

    if args.dry_run {
        info!(
            page_count = manifest.page_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        if manifest.pages.is_empty() {
            bail!("no page images found in {}", manifest.source_directory);
        }
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.cache_root.join("manifests").join("page_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");

    if manifest.pages.is_empty() {
        bail!("no page images found in {}", manifest.source_directory);
    }
    info!(page_count = manifest.page_count, "inventory completed");

    Ok(())
}

pub fn default_image_dir(cache_root: &Path) -> PathBuf {
    cache_root.join("pdf_images")
}

/// Lists the page images of `image_dir` in reading order. Hierarchy
/// reconstruction depends on this order, so pages are sorted by filename
/// exactly as the scanner numbered them.
pub fn build_manifest(image_dir: &Path) -> Result<PageInventoryManifest> {
    let number_pattern =
        Regex::new(r"(\d+)").context("failed to compile page number regex")?;

    let mut page_paths = discover_page_images(image_dir)?;
    page_paths.sort();

    if page_paths.is_empty() {
        warn!(path = %image_dir.display(), "no page images found");
    }

    let mut pages = Vec::with_capacity(page_paths.len());
    for path in page_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let page_number = parse_page_number(&filename, &number_pattern);
        let sha256 = sha256_file(&path)?;

        pages.push(PageEntry {
            filename,
            page_number,
            sha256,
        });
    }

    Ok(PageInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: image_dir.display().to_string(),
        page_count: pages.len(),
        pages,
    })
}

fn discover_page_images(image_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    let entries = fs::read_dir(image_dir)
        .with_context(|| format!("failed to read image directory {}", image_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", image_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);

        if is_png {
            images.push(path);
        }
    }

    Ok(images)
}

/// Last run of digits in the filename, e.g. `page-08.png` -> 8.
fn parse_page_number(filename: &str, pattern: &Regex) -> Option<u32> {
    pattern
        .find_iter(filename)
        .last()
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
