//! OCR backend abstraction.
//!
//! Defines the [`TextRecognizer`] and [`PdfRasterizer`] traits so the tools
//! doing the actual work (tesseract, poppler's `pdftoppm`) can be swapped out,
//! e.g. for in-process fakes in tests.

pub mod dpi;
pub mod pdftoppm;
pub mod tesseract;

use std::path::{Path, PathBuf};

/// Turns a raster image on disk into plain text.
#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;
    async fn is_available(&self) -> bool;
    /// Recognize the text in `image`. Output is returned untrimmed.
    async fn recognize(&self, image: &Path) -> anyhow::Result<String>;
}

/// Renders every page of a PDF to an image file.
#[async_trait::async_trait]
pub trait PdfRasterizer: Send + Sync {
    fn name(&self) -> &str;
    async fn is_available(&self) -> bool;
    /// Resolution pages are rendered at.
    fn dpi(&self) -> u32;
    /// Render `pdf` into `out_dir`, returning one image path per page in
    /// page order.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>>;
}

/// Run `<bin> <arg>` and report whether it exited successfully.
pub(crate) async fn probe(bin: &str, arg: &str) -> bool {
    tokio::process::Command::new(bin)
        .arg(arg)
        .kill_on_drop(true)
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}
