//! Invocation of the external yt-dlp binary

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Name of the binary searched for in PATH
pub const TOOL_BINARY: &str = "yt-dlp";

/// Progress template making yt-dlp print each progress dictionary as one JSON line
pub const PROGRESS_TEMPLATE: &str = "download:%(progress)j";

/// The external fetch tool
///
/// # Examples
///
/// ```no_run
/// use media_relay::config::ToolConfig;
/// use media_relay::fetcher::FetchTool;
///
/// let tool = FetchTool::from_config(&ToolConfig::default())
///     .expect("yt-dlp not found in PATH");
/// println!("using {}", tool.binary_path().display());
/// ```
#[derive(Debug, Clone)]
pub struct FetchTool {
    binary_path: PathBuf,
    config: ToolConfig,
}

impl FetchTool {
    /// Create a tool handle with an explicit binary path
    pub fn new(binary_path: PathBuf, config: ToolConfig) -> Self {
        Self {
            binary_path,
            config,
        }
    }

    /// Resolve the binary from the configured path, or from PATH when allowed
    pub fn from_config(config: &ToolConfig) -> Option<Self> {
        let binary_path = match &config.binary_path {
            Some(path) => Some(path.clone()),
            None if config.search_path => which::which(TOOL_BINARY).ok(),
            None => None,
        }?;
        Some(Self::new(binary_path, config.clone()))
    }

    /// Path of the executable
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments passed for a download of `url` into `output`
    pub fn args(&self, output: &Path, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if self.config.no_check_certificate {
            args.push("--no-check-certificate".into());
        }
        args.push("--user-agent".into());
        args.push(self.config.user_agent.clone().into());

        if let Some(cookies) = &self.config.cookies_file
            && cookies.is_file()
        {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }

        args.push("-f".into());
        args.push(self.config.format.clone().into());
        args.push("--merge-output-format".into());
        args.push(crate::utils::OUTPUT_EXTENSION.into());
        args.push("--newline".into());
        args.push("--progress".into());
        args.push("--progress-template".into());
        args.push(PROGRESS_TEMPLATE.into());
        args.push("--print-json".into());
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());

        args.extend(self.config.extra_args.iter().map(OsString::from));
        args.push(url.into());
        args
    }

    /// Launch the tool with piped stdout and stderr
    pub fn spawn(&self, output: &Path, url: &str) -> Result<Child> {
        Command::new(&self.binary_path)
            .args(self.args(output, url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "Failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })
    }
}
