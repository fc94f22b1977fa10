//! PDF rasterizer built on poppler's `pdftoppm`.

use super::PdfRasterizer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Output prefix; pdftoppm appends `-<page>.png`, zero-padded to the width
/// of the last page number.
const PAGE_PREFIX: &str = "page";

pub struct PdftoppmRasterizer {
    bin: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(bin: impl Into<String>, dpi: u32) -> Self {
        Self {
            bin: bin.into(),
            dpi,
        }
    }
}

/// Page number encoded in a pdftoppm output name like `page-07.png`.
fn page_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Rendered pages in `out_dir`, in page order.
async fn rendered_pages(out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(out_dir)
        .await
        .with_context(|| format!("Failed to list {:?}", out_dir))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(number) = name.to_str().and_then(page_number) {
            pages.push((number, entry.path()));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

#[async_trait::async_trait]
impl PdfRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn is_available(&self) -> bool {
        super::probe(&self.bin, "-v").await
    }

    fn dpi(&self) -> u32 {
        self.dpi
    }

    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        debug!("PdftoppmRasterizer: rendering {:?} at {} dpi", pdf, self.dpi);

        let output = Command::new(&self.bin)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("cannot run {}; is poppler-utils installed?", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("pdftoppm failed ({}): {}", output.status, stderr.trim());
        }

        let pages = rendered_pages(out_dir).await?;
        if pages.is_empty() {
            anyhow::bail!("pdftoppm rendered no pages");
        }
        debug!("PdftoppmRasterizer: rendered {} pages", pages.len());
        Ok(pages)
    }
}
