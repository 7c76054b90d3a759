use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::convert::{ConversionError, ConvertedDocument, DocumentConverter, DocumentKind};

const CONVERTED_PDF: &str = "converted.pdf";
const SOFFICE_PROFILE_DIR: &str = "lo-profile";

/// Converts Word documents by shelling out to `soffice` and `pandoc`.
#[derive(Debug, Clone)]
pub struct CliConverter {
    pandoc_bin: String,
    pdf_engine: Option<String>,
    soffice_bin: String,
    timeout: Duration,
}

impl CliConverter {
    pub fn new(pandoc_bin: impl Into<String>, soffice_bin: impl Into<String>) -> Self {
        Self {
            pandoc_bin: pandoc_bin.into(),
            pdf_engine: None,
            soffice_bin: soffice_bin.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            pdf_engine: config.pandoc_pdf_engine.clone(),
            ..Self::new(&config.pandoc_bin, &config.soffice_bin)
        }
        .with_timeout(config.convert_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `.doc` → `.docx` via LibreOffice. Returns the path of the produced file.
    ///
    /// Each run gets its own profile under `outdir`. With the shared per-user
    /// profile a second concurrent `soffice` hands its job to the running
    /// instance and exits without writing anything.
    async fn doc_to_docx(&self, source: &Path, outdir: &Path) -> Result<PathBuf, ConversionError> {
        let profile = outdir.join(SOFFICE_PROFILE_DIR);
        let args: Vec<OsString> = vec![
            format!("-env:UserInstallation=file://{}", profile.display()).into(),
            "--headless".into(),
            "--convert-to".into(),
            "docx".into(),
            "--outdir".into(),
            outdir.into(),
            source.into(),
        ];
        self.run(&self.soffice_bin, &args).await?;

        let mut name = source.file_stem().unwrap_or_default().to_os_string();
        name.push(".docx");
        ensure_exists(outdir.join(name))
    }

    /// Anything pandoc reads → PDF.
    async fn docx_to_pdf(&self, source: &Path, outdir: &Path) -> Result<PathBuf, ConversionError> {
        let target = outdir.join(CONVERTED_PDF);
        let mut args: Vec<OsString> = vec![source.into(), "-o".into(), target.clone().into()];
        if let Some(engine) = &self.pdf_engine {
            args.push(format!("--pdf-engine={engine}").into());
        }
        self.run(&self.pandoc_bin, &args).await?;

        ensure_exists(target)
    }

    async fn run(&self, program: &str, args: &[OsString]) -> Result<(), ConversionError> {
        debug!("Running {program} {:?}", args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::Timeout {
                program: program.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentConverter for CliConverter {
    async fn to_pdf(
        &self,
        source: &Path,
        kind: DocumentKind,
    ) -> Result<ConvertedDocument, ConversionError> {
        if !kind.needs_conversion() {
            return Ok(ConvertedDocument::passthrough(source));
        }

        let workdir = tempfile::tempdir()?;

        let docx = match kind {
            DocumentKind::Doc => self.doc_to_docx(source, workdir.path()).await?,
            _ => source.to_path_buf(),
        };
        let pdf = self.docx_to_pdf(&docx, workdir.path()).await?;

        info!("PDF successfully created: {}", pdf.display());
        Ok(ConvertedDocument::in_workdir(pdf, workdir))
    }
}

fn ensure_exists(path: PathBuf) -> Result<PathBuf, ConversionError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(ConversionError::MissingOutput(path))
    }
}
