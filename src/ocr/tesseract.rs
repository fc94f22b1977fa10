//! Tesseract CLI recognizer.

use super::TextRecognizer;
use anyhow::Context;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

pub struct TesseractRecognizer {
    bin: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(bin: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            language: language.into(),
        }
    }
}

#[async_trait::async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        super::probe(&self.bin, "--version").await
    }

    async fn recognize(&self, image: &Path) -> anyhow::Result<String> {
        debug!("TesseractRecognizer: recognizing {:?} ({})", image, self.language);

        // "stdout" as the output base makes tesseract print the text instead
        // of writing `<base>.txt`.
        let output = Command::new(&self.bin)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("cannot run {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tesseract failed ({}): {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
