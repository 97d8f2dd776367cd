//! Metafile rasterizer backends
//!
//! Each backend turns one `.wmf`/`.emf` into a sibling `.png` by driving an
//! external program. Backends are tried in priority order on the first file
//! of a run; the first one that works is used for the rest.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::error::LegacyError;
use super::probe::ToolProbe;
use crate::config::LegacyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterMethod {
    ImageMagick,
    LibreOffice,
    Wmf2eps,
}

impl RasterMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterMethod::ImageMagick => "imagemagick",
            RasterMethod::LibreOffice => "libreoffice",
            RasterMethod::Wmf2eps => "wmf2eps",
        }
    }
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    fn method(&self) -> RasterMethod;

    /// Render `source` into the PNG at `target`
    async fn rasterize(&self, source: &Path, target: &Path) -> Result<(), LegacyError>;
}

/// Run a prepared command with a timeout; the child is killed if it overruns
pub(crate) async fn run_tool(
    command: &mut Command,
    tool: &str,
    timeout: Duration,
) -> Result<Output, LegacyError> {
    command.kill_on_drop(true);
    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LegacyError::ToolMissing {
                tool: tool.to_string(),
            });
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(LegacyError::Timeout {
                tool: tool.to_string(),
                secs: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = match stderr.trim() {
            "" => stdout.trim(),
            detail => detail,
        };
        let detail: String = detail.chars().take(500).collect();
        return Err(LegacyError::ToolFailed {
            tool: tool.to_string(),
            detail: if detail.is_empty() {
                format!("exit status {}", output.status)
            } else {
                detail
            },
        });
    }
    Ok(output)
}

fn require_output(tool: &str, path: &Path) -> Result<(), LegacyError> {
    if path.exists() {
        Ok(())
    } else {
        Err(LegacyError::NoOutput {
            tool: tool.to_string(),
            path: path.to_path_buf(),
        })
    }
}

pub struct ImageMagick {
    command: String,
    density: u32,
    timeout: Duration,
}

impl ImageMagick {
    pub fn new(command: impl Into<String>, config: &LegacyConfig) -> Self {
        Self {
            command: command.into(),
            density: config.density,
            timeout: Duration::from_secs(config.raster_timeout_secs),
        }
    }
}

#[async_trait]
impl Rasterizer for ImageMagick {
    fn method(&self) -> RasterMethod {
        RasterMethod::ImageMagick
    }

    async fn rasterize(&self, source: &Path, target: &Path) -> Result<(), LegacyError> {
        let mut command = Command::new(&self.command);
        command
            .arg("-density")
            .arg(self.density.to_string())
            .args(["-background", "white", "-alpha", "remove", "-alpha", "off"])
            .args(["-colorspace", "sRGB"])
            .arg(source)
            .arg(target);
        run_tool(&mut command, &self.command, self.timeout).await?;
        require_output(&self.command, target)
    }
}

pub struct LibreOffice {
    command: String,
    timeout: Duration,
}

impl LibreOffice {
    pub fn new(command: impl Into<String>, config: &LegacyConfig) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(config.office_timeout_secs),
        }
    }
}

#[async_trait]
impl Rasterizer for LibreOffice {
    fn method(&self) -> RasterMethod {
        RasterMethod::LibreOffice
    }

    async fn rasterize(&self, source: &Path, target: &Path) -> Result<(), LegacyError> {
        let out_dir = target.parent().unwrap_or_else(|| Path::new("."));
        let mut command = Command::new(&self.command);
        command
            .args(["--headless", "--convert-to", "png", "--outdir"])
            .arg(out_dir)
            .arg(source);
        // soffice reports some failures on stderr with a zero exit status
        match run_tool(&mut command, &self.command, self.timeout).await {
            Ok(_) => {}
            Err(LegacyError::ToolFailed { detail, .. }) => {
                log::warn!("LibreOffice: {detail}");
            }
            Err(e) => return Err(e),
        }
        require_output(&self.command, target)
    }
}

/// `wmf2eps` to PostScript, then ImageMagick to PNG
pub struct Wmf2eps {
    wmf2eps: String,
    convert: String,
    density: u32,
    eps_timeout: Duration,
    convert_timeout: Duration,
}

impl Wmf2eps {
    pub fn new(wmf2eps: impl Into<String>, convert: impl Into<String>, config: &LegacyConfig) -> Self {
        Self {
            wmf2eps: wmf2eps.into(),
            convert: convert.into(),
            density: config.density,
            eps_timeout: Duration::from_secs(config.wmf2eps_timeout_secs),
            convert_timeout: Duration::from_secs(config.eps_timeout_secs),
        }
    }
}

#[async_trait]
impl Rasterizer for Wmf2eps {
    fn method(&self) -> RasterMethod {
        RasterMethod::Wmf2eps
    }

    async fn rasterize(&self, source: &Path, target: &Path) -> Result<(), LegacyError> {
        let eps: PathBuf = target.with_extension("eps");
        let mut command = Command::new(&self.wmf2eps);
        command.arg("-o").arg(&eps).arg(source);
        if let Some(dir) = source.parent() {
            command.current_dir(dir);
        }
        run_tool(&mut command, &self.wmf2eps, self.eps_timeout).await?;
        require_output(&self.wmf2eps, &eps)?;

        let mut convert = Command::new(&self.convert);
        convert
            .arg("-density")
            .arg(self.density.to_string())
            .args(["-background", "white", "-alpha", "remove"])
            .arg(&eps)
            .arg(target);
        let result = run_tool(&mut convert, &self.convert, self.convert_timeout).await;
        if let Err(e) = tokio::fs::remove_file(&eps).await {
            log::debug!("Could not remove {}: {e}", eps.display());
        }
        result?;
        require_output(&self.convert, target)
    }
}

/// Backends available on this system, in priority order
pub fn rasterizer_chain(probe: &ToolProbe, config: &LegacyConfig) -> Vec<Box<dyn Rasterizer>> {
    let mut chain: Vec<Box<dyn Rasterizer>> = Vec::new();
    if let Some(magick) = &probe.imagemagick {
        chain.push(Box::new(ImageMagick::new(magick.as_str(), config)));
    }
    if let Some(soffice) = &probe.libreoffice {
        chain.push(Box::new(LibreOffice::new(soffice.as_str(), config)));
    }
    if let (Some(wmf2eps), Some(magick)) = (&probe.wmf2eps, &probe.imagemagick) {
        chain.push(Box::new(Wmf2eps::new(wmf2eps.as_str(), magick.as_str(), config)));
    }
    chain
}
