//! Detection of the external converters used for metafile formulas

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;

const IMAGEMAGICK_CANDIDATES: &[&str] = &["magick", "convert"];
const LIBREOFFICE_CANDIDATES: &[&str] = &[
    "libreoffice",
    "soffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
];

static DETECTED: OnceCell<ToolProbe> = OnceCell::const_new();

/// Which converters are installed, by the command that invokes them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolProbe {
    pub imagemagick: Option<String>,
    pub libreoffice: Option<String>,
    pub wmf2eps: Option<String>,
}

impl ToolProbe {
    /// A probe that found nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Probe the system now
    pub async fn detect(timeout: Duration) -> Self {
        let imagemagick = first_responding(IMAGEMAGICK_CANDIDATES, "-version", timeout).await;
        let libreoffice = first_responding(LIBREOFFICE_CANDIDATES, "--version", timeout).await;
        // wmf2eps exits non-zero on -h, so only spawning has to succeed
        let wmf2eps = spawns("wmf2eps", "-h", timeout)
            .await
            .then(|| "wmf2eps".to_string());

        let probe = ToolProbe {
            imagemagick,
            libreoffice,
            wmf2eps,
        };
        log::info!("Converter probe: {probe:?}");
        probe
    }

    /// Probe once per process and reuse the result
    pub async fn cached(timeout: Duration) -> &'static ToolProbe {
        DETECTED.get_or_init(|| Self::detect(timeout)).await
    }

    pub fn any(&self) -> bool {
        self.imagemagick.is_some() || self.libreoffice.is_some() || self.wmf2eps.is_some()
    }
}

async fn first_responding(candidates: &[&str], flag: &str, timeout: Duration) -> Option<String> {
    for candidate in candidates {
        if succeeds(candidate, flag, timeout).await {
            return Some(candidate.to_string());
        }
    }
    None
}

fn quiet(program: &str, flag: &str) -> Command {
    let mut command = Command::new(program);
    command
        .arg(flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    command
}

async fn succeeds(program: &str, flag: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, quiet(program, flag).status()).await {
        Ok(Ok(status)) => status.success(),
        _ => false,
    }
}

async fn spawns(program: &str, flag: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, quiet(program, flag).status()).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_not_detected() {
        let found = first_responding(
            &["quizdocx-no-such-tool-a", "quizdocx-no-such-tool-b"],
            "--version",
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(found, None);
    }

    #[test]
    fn test_empty_probe() {
        assert!(!ToolProbe::none().any());
        let probe = ToolProbe {
            wmf2eps: Some("wmf2eps".into()),
            ..ToolProbe::none()
        };
        assert!(probe.any());
    }
}
