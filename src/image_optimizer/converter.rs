//! Out-of-process image conversion
//!
//! [`ConverterBackend`] is the single seam through which the pipeline reaches
//! an external codec, both for format normalization (HEIC/HEIF and anything the
//! in-process decoders reject) and for the compression path of the quality
//! search. [`MagickConverter`] implements it by running an ImageMagick-style
//! executable:
//!
//! ```text
//! <program> [prefix args] <input> -colorspace sRGB -auto-orient -strip -quality <N> <output>
//! ```
//!
//! Input and output travel through two temporary files created right before
//! the call. Both are `tempfile::NamedTempFile`s, so they are removed on every
//! exit path (success, non-zero exit, spawn failure, timeout, panic unwind).
//! Success means exit code 0 and a non-empty output file; stdout and stderr
//! are discarded.

use super::config::ConverterConfig;
use super::format::ImageFamily;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Unsharp mask applied after the compression resize step
const COMPRESS_UNSHARP: &str = "0x0.5+0.5+0.008";

/// Chroma subsampling used by the compression path
const COMPRESS_SAMPLING_FACTOR: &str = "4:2:0";

/// Errors from an external conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The executable could not be started (usually not installed)
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The executable exited unsuccessfully
    #[error("'{program}' exited with status {}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Exited { program: String, code: Option<i32> },

    /// The executable exited 0 but wrote nothing
    #[error("'{program}' produced no output")]
    EmptyOutput { program: String },

    /// The executable ran past its deadline and was killed
    #[error("'{program}' timed out after {timeout_ms}ms")]
    TimedOut { program: String, timeout_ms: u128 },

    /// Scratch file handling failed
    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow interface to an external codec.
///
/// Implementations must be safe to share across threads; every call is
/// request-scoped and leaves nothing behind.
pub trait ConverterBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Convert `input` to baseline sRGB JPEG with orientation applied and
    /// metadata stripped.
    fn convert(&self, input: &[u8], hint: ImageFamily) -> Result<Vec<u8>, ConversionError>;

    /// Re-encode `input` as JPEG at `quality`, shrinking it to fit
    /// `max_dimension` if it is larger.
    fn compress(
        &self,
        input: &[u8],
        hint: ImageFamily,
        quality: u8,
        max_dimension: u32,
    ) -> Result<Vec<u8>, ConversionError>;
}

/// ImageMagick-compatible command-line converter
#[derive(Debug, Clone)]
pub struct MagickConverter {
    program: PathBuf,
    prefix_args: Vec<OsString>,
    normalize_quality: u8,
    timeout: Duration,
}

impl MagickConverter {
    /// Create a converter for `program` with default quality and timeout
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let defaults = ConverterConfig::default();
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            normalize_quality: defaults.normalize_quality,
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        let mut parts = config.program.split_whitespace();
        let program = parts.next().unwrap_or_default().to_string();
        Self {
            program: PathBuf::from(program),
            // "magick convert" style invocations keep the subcommand here
            prefix_args: parts.map(OsString::from).collect(),
            normalize_quality: config.normalize_quality.clamp(1, 100),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Arguments placed before the input path
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_normalize_quality(mut self, quality: u8) -> Self {
        self.normalize_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for the normalization pass
    pub fn normalize_args(input: &Path, output: &Path, quality: u8) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-colorspace".into(),
            "sRGB".into(),
            "-auto-orient".into(),
            "-strip".into(),
            "-quality".into(),
            quality.to_string().into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Arguments for the compression pass
    pub fn compress_args(
        input: &Path,
        output: &Path,
        quality: u8,
        max_dimension: u32,
    ) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-colorspace".into(),
            "sRGB".into(),
            "-auto-orient".into(),
            // ">" only shrinks, never enlarges
            "-resize".into(),
            format!("{max_dimension}x{max_dimension}>").into(),
            "-unsharp".into(),
            COMPRESS_UNSHARP.into(),
            "-sampling-factor".into(),
            COMPRESS_SAMPLING_FACTOR.into(),
            "-strip".into(),
            "-quality".into(),
            quality.to_string().into(),
            output.as_os_str().to_owned(),
        ]
    }

    fn program_label(&self) -> String {
        self.program.display().to_string()
    }

    /// Run one conversion through a pair of scratch files.
    fn run<F>(&self, input: &[u8], hint: ImageFamily, build_args: F) -> Result<Vec<u8>, ConversionError>
    where
        F: FnOnce(&Path, &Path) -> Vec<OsString>,
    {
        let program = self.program_label();

        let mut input_file = tempfile::Builder::new()
            .prefix("shiage-in-")
            .suffix(&format!(".{}", hint.extension()))
            .tempfile()?;
        input_file.write_all(input)?;
        input_file.flush()?;

        let output_file = tempfile::Builder::new()
            .prefix("shiage-out-")
            .suffix(".jpg")
            .tempfile()?;

        let args = build_args(input_file.path(), output_file.path());

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = wait_with_timeout(&mut child, self.timeout, &program)?;
        if !status.success() {
            return Err(ConversionError::Exited {
                program,
                code: status.code(),
            });
        }

        let data = std::fs::read(output_file.path())?;
        if data.is_empty() {
            return Err(ConversionError::EmptyOutput { program });
        }

        tracing::debug!(
            program = %program,
            input_bytes = input.len(),
            output_bytes = data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "external conversion finished"
        );

        Ok(data)
    }
}

impl ConverterBackend for MagickConverter {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("converter")
    }

    fn convert(&self, input: &[u8], hint: ImageFamily) -> Result<Vec<u8>, ConversionError> {
        let quality = self.normalize_quality;
        self.run(input, hint, |src, dst| Self::normalize_args(src, dst, quality))
    }

    fn compress(
        &self,
        input: &[u8],
        hint: ImageFamily,
        quality: u8,
        max_dimension: u32,
    ) -> Result<Vec<u8>, ConversionError> {
        let quality = quality.clamp(1, 100);
        self.run(input, hint, |src, dst| {
            Self::compress_args(src, dst, quality, max_dimension)
        })
    }
}

/// The parts of a running child the timeout loop needs.
trait RunningTool {
    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> std::io::Result<()>;
    fn wait(&mut self) -> std::io::Result<ExitStatus>;
}

impl RunningTool for Child {
    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn kill(&mut self) -> std::io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> std::io::Result<ExitStatus> {
        Child::wait(self)
    }
}

/// Kill and reap the child so it does not linger as a zombie.
fn stop<T: RunningTool>(child: &mut T) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait for `child`, killing it once `timeout` has elapsed or polling fails.
fn wait_with_timeout<T: RunningTool>(
    child: &mut T,
    timeout: Duration,
    program: &str,
) -> Result<ExitStatus, ConversionError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                stop(child);
                return Err(ConversionError::Io(e));
            }
        }
        if Instant::now() >= deadline {
            stop(child);
            return Err(ConversionError::TimedOut {
                program: program.to_string(),
                timeout_ms: timeout.as_millis(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
