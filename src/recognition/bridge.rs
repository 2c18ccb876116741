use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::RgbImage;
use log::{debug, warn};

use crate::core::error::RecognitionError;
use crate::recognition::{FormulaRecognizer, Recognition};

/// Exit status an external recognizer uses to say the input itself is unusable.
/// Anything else non-zero is treated as worth one more try.
pub const FATAL_EXIT_CODE: i32 = 2;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs an external image-to-LaTeX program on a batch of crops.
///
/// The crops are written as PNG files and appended to the argument list; the
/// program prints a JSON array with one `{"latex", "confidence"}` object per file,
/// in order.
#[derive(Debug)]
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
    timeout: Option<Duration>,
    batches: AtomicU64,
}

impl CommandRecognizer {
    pub fn new(program: PathBuf, work_dir: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            work_dir,
            timeout: None,
            batches: AtomicU64::new(0),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Kills a call that runs longer than `timeout`; the batch then counts as a
    /// transient failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn write_batch(&self, dir: &Path, crops: &[RgbImage]) -> Result<Vec<PathBuf>, RecognitionError> {
        fs::create_dir_all(dir).map_err(|err| {
            RecognitionError::Fatal(format!("cannot create {}: {err}", dir.display()))
        })?;
        crops
            .iter()
            .enumerate()
            .map(|(idx, crop)| -> Result<PathBuf, RecognitionError> {
                let path = dir.join(format!("crop_{idx:03}.png"));
                crop.save(&path).map_err(|err| {
                    RecognitionError::Fatal(format!("cannot write {}: {err}", path.display()))
                })?;
                Ok(path)
            })
            .collect()
    }

    fn run(&self, paths: &[PathBuf]) -> Result<Vec<Recognition>, RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(paths)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                RecognitionError::Fatal(format!(
                    "failed to invoke recognizer {}: {err}",
                    self.program.display()
                ))
            })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        // On timeout the reader threads are left to finish on their own: a
        // grandchild may still hold the pipes open.
        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim();
            return Err(match status.code() {
                Some(FATAL_EXIT_CODE) => {
                    RecognitionError::Fatal(format!("recognizer rejected input: {stderr}"))
                }
                code => RecognitionError::Transient(format!(
                    "recognizer exited with {}: {stderr}",
                    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                )),
            });
        }

        let stdout = String::from_utf8_lossy(&stdout);
        serde_json::from_str(&stdout).map_err(|err| {
            RecognitionError::Transient(format!("failed to parse recognizer JSON response: {err}"))
        })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, RecognitionError> {
        let wait_failed = |err: std::io::Error| {
            RecognitionError::Transient(format!("failed to wait for recognizer: {err}"))
        };
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(wait_failed);
        };
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(wait_failed)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    "recognizer {} exceeded {:.1}s, killing it",
                    self.program.display(),
                    timeout.as_secs_f32()
                );
                if let Err(err) = child.kill() {
                    warn!("could not kill recognizer: {err}");
                }
                let _ = child.wait();
                return Err(RecognitionError::Transient(format!(
                    "recognizer timed out after {:.1}s",
                    timeout.as_secs_f32()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Reads a child pipe to the end on its own thread so a chatty child never blocks.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl FormulaRecognizer for CommandRecognizer {
    fn recognize(&self, crops: &[RgbImage]) -> Result<Vec<Recognition>, RecognitionError> {
        if crops.is_empty() {
            return Ok(Vec::new());
        }
        let batch = self.batches.fetch_add(1, Ordering::Relaxed);
        let dir = self
            .work_dir
            .join(format!("batch_{}_{batch:05}", std::process::id()));

        let result = self
            .write_batch(&dir, crops)
            .and_then(|paths| {
                debug!("recognizer batch {batch}: {} crops", paths.len());
                self.run(&paths)
            });

        if let Err(err) = fs::remove_dir_all(&dir) {
            warn!("could not clean up {}: {err}", dir.display());
        }
        result
    }
}
