//! Document → OCR pages pipeline.
//!
//! PDFs are rasterized and recognized page by page; anything else is treated
//! as a single raster image. Jobs are admitted through a bounded pool and may
//! be cut off by a timeout.

use crate::ocr::{dpi, PdfRasterizer, TextRecognizer};
use crate::schema::{OcrPage, PageDimensions, DEFAULT_DPI};
use anyhow::{Context, Result};
use base64::Engine as _;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

/// How a stored document is processed, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Self {
        let is_pdf = Path::new(filename)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            Self::Pdf
        } else {
            Self::Image
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub include_image_base64: bool,
}

pub struct Extractor {
    recognizer: Arc<dyn TextRecognizer>,
    rasterizer: Arc<dyn PdfRasterizer>,
    jobs: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl Extractor {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        rasterizer: Arc<dyn PdfRasterizer>,
        max_jobs: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            recognizer,
            rasterizer,
            jobs: Arc::new(Semaphore::new(max_jobs.max(1))),
            timeout,
        }
    }

    pub fn recognizer(&self) -> &dyn TextRecognizer {
        self.recognizer.as_ref()
    }

    pub fn rasterizer(&self) -> &dyn PdfRasterizer {
        self.rasterizer.as_ref()
    }

    /// OCR the document at `path`. `filename` picks the processing path.
    ///
    /// Either every page succeeds or the whole call fails.
    #[instrument(level = "debug", skip_all, fields(filename = %filename))]
    pub async fn extract(
        &self,
        path: &Path,
        filename: &str,
        options: ExtractOptions,
    ) -> Result<Vec<OcrPage>> {
        let _permit = self.jobs.acquire().await.context("OCR job pool closed")?;

        let kind = DocumentKind::from_filename(filename);
        info!(
            "Starting OCR for {} ({:?}, recognizer={})",
            filename,
            kind,
            self.recognizer.name()
        );

        let work = self.run(path, kind, options);
        let pages = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| anyhow::anyhow!("timed out after {:?}", limit))??,
            None => work.await?,
        };

        info!("OCR complete for {}: {} pages", filename, pages.len());
        Ok(pages)
    }

    async fn run(
        &self,
        path: &Path,
        kind: DocumentKind,
        options: ExtractOptions,
    ) -> Result<Vec<OcrPage>> {
        match kind {
            DocumentKind::Pdf => self.extract_pdf(path, options).await,
            DocumentKind::Image => Ok(vec![
                self.extract_page(0, path, DEFAULT_DPI, options).await?,
            ]),
        }
    }

    async fn extract_pdf(&self, path: &Path, options: ExtractOptions) -> Result<Vec<OcrPage>> {
        // Removed on drop, including when the job is cancelled.
        let workdir = tempfile::Builder::new()
            .prefix("ocr-pages")
            .tempdir()
            .context("Failed to create page directory")?;

        let images = self
            .rasterizer
            .rasterize(path, workdir.path())
            .await
            .with_context(|| format!("{} could not rasterize {:?}", self.rasterizer.name(), path))?;
        debug!("Rasterized {} pages into {:?}", images.len(), workdir.path());

        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let page = self
                .extract_page(index, image, self.rasterizer.dpi(), options)
                .await
                .with_context(|| format!("page {}", index))?;
            pages.push(page);
        }
        Ok(pages)
    }

    async fn extract_page(
        &self,
        index: usize,
        image: &Path,
        fallback_dpi: u32,
        options: ExtractOptions,
    ) -> Result<OcrPage> {
        let data = tokio::fs::read(image)
            .await
            .with_context(|| format!("Failed to read {:?}", image))?;
        let (width, height) = image_size(&data)?;
        let dpi = dpi::detect_dpi(&data).unwrap_or(fallback_dpi);

        let text = self.recognizer.recognize(image).await?;

        let image_base64 = if options.include_image_base64 {
            data_uri(image, &data)
        } else {
            String::new()
        };

        Ok(OcrPage::full_page(
            index,
            text.trim().to_string(),
            PageDimensions { dpi, height, width },
            image_base64,
        ))
    }
}

/// Pixel size from the image header.
fn image_size(data: &[u8]) -> Result<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(data)).with_guessed_format()?;
    if reader.format().is_none() {
        anyhow::bail!("cannot identify image file");
    }
    Ok(reader.into_dimensions()?)
}

fn data_uri(path: &Path, data: &[u8]) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}
