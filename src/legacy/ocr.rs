//! Formula recognition
//!
//! The recognizer is a seam: production runs shell out to an OCR model
//! ([`CommandRecognizer`]); tests inject a double.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::LegacyError;
use super::rasterize::run_tool;
use crate::config::LegacyConfig;

const INPUT_PLACEHOLDER: &str = "{input}";

#[async_trait]
pub trait FormulaRecognizer: Send + Sync {
    /// Whether recognition can run at all on this system
    async fn available(&self) -> bool {
        true
    }

    /// LaTeX for the formula bitmap at `image`, `None` when nothing was
    /// recognized
    async fn recognize(&self, image: &Path) -> Result<Option<String>, LegacyError>;
}

/// Runs an external OCR command; `{input}` in the arguments is replaced by
/// the image path (appended when absent)
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRecognizer {
    pub fn from_config(config: &LegacyConfig) -> Option<Self> {
        let mut parts = config.ocr_command.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout: Duration::from_secs(config.ocr_timeout_secs),
        })
    }

    fn command(&self, image: &Path) -> Command {
        let input = image.to_string_lossy();
        let mut command = Command::new(&self.program);
        let mut has_placeholder = false;
        for arg in &self.args {
            if arg.contains(INPUT_PLACEHOLDER) {
                has_placeholder = true;
                command.arg(arg.replace(INPUT_PLACEHOLDER, &input));
            } else {
                command.arg(arg);
            }
        }
        if !has_placeholder {
            command.arg(image);
        }
        command
    }
}

#[async_trait]
impl FormulaRecognizer for CommandRecognizer {
    async fn available(&self) -> bool {
        find_program(&self.program).is_some()
    }

    async fn recognize(&self, image: &Path) -> Result<Option<String>, LegacyError> {
        let output = run_tool(&mut self.command(image), &self.program, self.timeout).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_recognizer_output(&stdout, image))
    }
}

/// The last non-empty line of the output, without a leading `<path>: ` echo
pub fn parse_recognizer_output(stdout: &str, image: &Path) -> Option<String> {
    let line = stdout.lines().map(str::trim).rev().find(|l| !l.is_empty())?;
    let echoed = format!("{}: ", image.display());
    let latex = line.strip_prefix(echoed.as_str()).unwrap_or(line).trim();
    (!latex.is_empty()).then(|| latex.to_string())
}

/// Resolve a program name against `PATH`
fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .flat_map(|dir| {
            let plain = dir.join(program);
            let exe = dir.join(format!("{program}.exe"));
            [plain, exe]
        })
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_takes_last_line_and_strips_echo() {
        let image = Path::new("/tmp/asset_0001.ocr.png");
        let stdout = "loading model\n/tmp/asset_0001.ocr.png: \\frac{1}{2}\n\n";
        assert_eq!(
            parse_recognizer_output(stdout, image),
            Some("\\frac{1}{2}".to_string())
        );
        assert_eq!(parse_recognizer_output("x^{2}", image), Some("x^{2}".to_string()));
        assert_eq!(parse_recognizer_output("  \n", image), None);
    }

    #[test]
    fn test_command_line_from_config() {
        let config = LegacyConfig {
            ocr_command: "pix2tex --no-cuda {input}".to_string(),
            ..LegacyConfig::default()
        };
        let recognizer = CommandRecognizer::from_config(&config).unwrap();
        assert_eq!(recognizer.program, "pix2tex");
        assert_eq!(recognizer.args, vec!["--no-cuda", "{input}"]);

        let blank = LegacyConfig {
            ocr_command: "  ".to_string(),
            ..LegacyConfig::default()
        };
        assert!(CommandRecognizer::from_config(&blank).is_none());
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let config = LegacyConfig {
            ocr_command: "quizdocx-no-such-ocr {input}".to_string(),
            ..LegacyConfig::default()
        };
        let recognizer = CommandRecognizer::from_config(&config).unwrap();
        assert!(!recognizer.available().await);
    }
}
