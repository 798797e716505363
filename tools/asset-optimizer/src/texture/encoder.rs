//! External texture encoder seam and the `toktx` implementation

use super::TextureFormat;
use crate::config::TextureOptions;
use crate::error::TextureError;
use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that can turn a raster image into a KTX2 container
pub trait TextureEncoder {
    /// Human-readable name used in log output
    fn name(&self) -> &str;

    /// Whether the encoder can run at all
    fn probe(&self) -> bool;

    /// Encode `input` into `output` using one target format
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        format: TextureFormat,
        options: &TextureOptions,
    ) -> Result<(), TextureError>;
}

/// Lets several stages share one encoder
impl<T: TextureEncoder + ?Sized> TextureEncoder for Rc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn probe(&self) -> bool {
        (**self).probe()
    }

    fn encode(
        &self,
        input: &Path,
        output: &Path,
        format: TextureFormat,
        options: &TextureOptions,
    ) -> Result<(), TextureError> {
        (**self).encode(input, output, format, options)
    }
}

/// KTX-Software's `toktx`, located on `PATH`
#[derive(Debug, Clone)]
pub struct ToktxEncoder {
    program: Option<PathBuf>,
}

impl ToktxEncoder {
    pub fn new() -> Self {
        Self {
            program: which::which("toktx").ok(),
        }
    }

    /// Use an explicit executable instead of searching `PATH`
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl Default for ToktxEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Command-line arguments for one `toktx` invocation
pub fn toktx_args(
    input: &Path,
    output: &Path,
    format: TextureFormat,
    options: &TextureOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if options.enable_mipmaps {
        args.push("--genmipmap".into());
    }

    match format {
        TextureFormat::Etc1s => {
            args.extend(["--bcmp", "--clevel", "1", "--qlevel"].map(OsString::from));
            args.push(options.quality.to_string().into());
        }
        TextureFormat::Astc => {
            args.extend(["--encode", "astc", "--astc-quality"].map(OsString::from));
            args.push(options.astc_quality.as_arg().into());
        }
        // toktx has no native BC7 path; the desktop slot is a basis-lz
        // encode at the requested effort
        TextureFormat::Bc7 => {
            args.extend(["--encode", "basis-lz", "--clevel"].map(OsString::from));
            args.push(options.bc7_quality.clevel().to_string().into());
        }
    }

    args.push(output.as_os_str().to_owned());
    args.push(input.as_os_str().to_owned());
    args
}

impl TextureEncoder for ToktxEncoder {
    fn name(&self) -> &str {
        "toktx"
    }

    fn probe(&self) -> bool {
        let Some(program) = &self.program else {
            return false;
        };
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn encode(
        &self,
        input: &Path,
        output: &Path,
        format: TextureFormat,
        options: &TextureOptions,
    ) -> Result<(), TextureError> {
        let program = self.program.as_ref().ok_or(TextureError::EncoderNotFound)?;

        let mut command = Command::new(program);
        command.args(toktx_args(input, output, format, options));
        debug!("Running {:?}", command);

        let (status, stderr) = match options.timeout {
            None => {
                let out = command.output().map_err(TextureError::Spawn)?;
                (out.status, String::from_utf8_lossy(&out.stderr).into_owned())
            }
            Some(limit) => run_with_timeout(command, format, limit)?,
        };

        if !status.success() {
            return Err(TextureError::EncoderFailed {
                format,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !output.exists() {
            return Err(TextureError::MissingOutput {
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Run to completion or kill the child once `limit` has passed
///
/// Stderr goes to an anonymous file so a chatty encoder cannot block on a
/// full pipe while we poll.
fn run_with_timeout(
    mut command: Command,
    format: TextureFormat,
    limit: Duration,
) -> Result<(ExitStatus, String), TextureError> {
    let mut stderr_file = tempfile::tempfile().map_err(TextureError::Spawn)?;
    let stderr_handle = stderr_file.try_clone().map_err(TextureError::Spawn)?;

    let mut child = command
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_handle))
        .spawn()
        .map_err(TextureError::Spawn)?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait().map_err(TextureError::Spawn)? {
            Some(status) => break status,
            None if started.elapsed() >= limit => {
                // Already exited or unkillable; either way the result is a timeout
                let _ = child.kill();
                let _ = child.wait();
                return Err(TextureError::Timeout {
                    format,
                    seconds: limit.as_secs(),
                });
            }
            None => std::thread::sleep(POLL_INTERVAL),
        }
    };

    let mut stderr = String::new();
    stderr_file
        .seek(SeekFrom::Start(0))
        .and_then(|_| stderr_file.read_to_string(&mut stderr))
        .map_err(TextureError::Spawn)?;

    Ok((status, stderr))
}
