//! Server configuration.
//!
//! Everything is read from the environment (after `.env` is loaded by `main`),
//! with defaults that match the hosted API this server stands in for.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Model name echoed back when an OCR request does not name one.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Top-level server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory uploaded files are written to, keyed by filename.
    pub upload_dir: PathBuf,
    pub default_model: String,
    pub ocr: OcrConfig,
}

/// Settings for the external OCR tools and the job pool around them.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub tesseract_lang: String,
    pub pdftoppm_bin: String,
    /// Resolution PDF pages are rasterized at.
    pub pdf_dpi: u32,
    /// Maximum number of documents being OCR'd at once.
    pub max_jobs: usize,
    /// Per-document time limit; `None` means unbounded.
    pub timeout: Option<Duration>,
}

impl ServerConfig {
    /// Load the config from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the config through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host: String = parse_or(&lookup, "OCR_HOST", "0.0.0.0".to_string())?;
        let port: u16 = parse_or(&lookup, "OCR_PORT", 9090)?;
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

        let default_jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let max_jobs: usize = parse_or(&lookup, "OCR_MAX_JOBS", default_jobs)?;
        if max_jobs == 0 {
            anyhow::bail!("OCR_MAX_JOBS must be at least 1");
        }

        let timeout_secs: u64 = parse_or(&lookup, "OCR_TIMEOUT_SECS", 0)?;

        Ok(Self {
            bind_addr,
            upload_dir: PathBuf::from(parse_or(
                &lookup,
                "OCR_UPLOAD_DIR",
                "uploaded_files".to_string(),
            )?),
            default_model: parse_or(&lookup, "OCR_DEFAULT_MODEL", DEFAULT_MODEL.to_string())?,
            ocr: OcrConfig {
                tesseract_bin: parse_or(&lookup, "TESSERACT_BIN", "tesseract".to_string())?,
                tesseract_lang: parse_or(&lookup, "TESSERACT_LANG", "eng".to_string())?,
                pdftoppm_bin: parse_or(&lookup, "PDFTOPPM_BIN", "pdftoppm".to_string())?,
                pdf_dpi: parse_or(&lookup, "OCR_PDF_DPI", 200)?,
                max_jobs,
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
