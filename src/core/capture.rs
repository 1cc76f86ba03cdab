//! Run-scoped capture of standard output and standard error.
//!
//! While a run is being reported, anything written to stdout/stderr must not
//! end up in the status channel. A [`CaptureScope`] owns the redirection for
//! the whole run and releases it exactly once: explicitly at finalize, or on
//! drop if finalize never happens.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use gag::BufferRedirect;
use thiserror::Error;
use tracing::{debug, warn};

/// Text captured during the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Output capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to redirect {stream}: {source}")]
    Acquire {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read captured {stream}: {source}")]
    Read {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Output capture was already released")]
    AlreadyReleased,
}

/// An active capture of both standard streams
pub trait StreamCapture {
    /// Restore the streams and return what was captured.
    ///
    /// Streams are restored even when reading the buffers fails.
    fn release(self: Box<Self>) -> Result<CapturedOutput, CaptureError>;
}

/// Process-wide redirection of the stdout/stderr file descriptors
pub struct ProcessCapture {
    stdout: BufferRedirect,
    stderr: BufferRedirect,
}

impl ProcessCapture {
    /// Start redirecting both streams into temporary buffers
    pub fn acquire() -> Result<Self, CaptureError> {
        let stdout = BufferRedirect::stdout().map_err(|source| CaptureError::Acquire {
            stream: "stdout",
            source,
        })?;
        // stdout is restored by drop if this fails
        let stderr = BufferRedirect::stderr().map_err(|source| CaptureError::Acquire {
            stream: "stderr",
            source,
        })?;

        Ok(Self { stdout, stderr })
    }
}

impl StreamCapture for ProcessCapture {
    fn release(self: Box<Self>) -> Result<CapturedOutput, CaptureError> {
        let Self {
            mut stdout,
            mut stderr,
        } = *self;

        // Rust's stdout is line buffered; push pending bytes to the fd first
        if let Err(e) = io::stdout().flush() {
            debug!(error = %e, "Failed to flush stdout before release");
        }
        if let Err(e) = io::stderr().flush() {
            debug!(error = %e, "Failed to flush stderr before release");
        }

        let mut captured = CapturedOutput::default();
        stdout
            .read_to_string(&mut captured.stdout)
            .map_err(|source| CaptureError::Read {
                stream: "stdout",
                source,
            })?;
        stderr
            .read_to_string(&mut captured.stderr)
            .map_err(|source| CaptureError::Read {
                stream: "stderr",
                source,
            })?;

        // Dropping the redirects restores the original descriptors
        drop(stdout);
        drop(stderr);

        Ok(captured)
    }
}

/// Cloneable in-memory byte sink
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer contents as (lossy) UTF-8
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture into in-memory buffers the host writes to explicitly
#[derive(Debug, Clone, Default)]
pub struct MemoryCapture {
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

impl MemoryCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer standing in for stdout
    pub fn stdout(&self) -> SharedBuffer {
        self.stdout.clone()
    }

    /// Writer standing in for stderr
    pub fn stderr(&self) -> SharedBuffer {
        self.stderr.clone()
    }
}

impl StreamCapture for MemoryCapture {
    fn release(self: Box<Self>) -> Result<CapturedOutput, CaptureError> {
        Ok(CapturedOutput {
            stdout: self.stdout.contents(),
            stderr: self.stderr.contents(),
        })
    }
}

/// Owns the capture for the lifetime of a run
pub struct CaptureScope {
    capture: Option<Box<dyn StreamCapture>>,
}

impl CaptureScope {
    pub fn new(capture: Box<dyn StreamCapture>) -> Self {
        debug!("Output capture started");
        Self {
            capture: Some(capture),
        }
    }

    /// Whether the streams are still redirected
    pub fn is_active(&self) -> bool {
        self.capture.is_some()
    }

    /// Restore the streams and hand back the captured text
    pub fn release(&mut self) -> Result<CapturedOutput, CaptureError> {
        let capture = self.capture.take().ok_or(CaptureError::AlreadyReleased)?;
        let captured = capture.release()?;
        debug!(
            stdout_bytes = captured.stdout.len(),
            stderr_bytes = captured.stderr.len(),
            "Output capture released"
        );
        Ok(captured)
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        if let Some(capture) = self.capture.take() {
            // Run was never finalized; restore streams and discard the text
            if let Err(e) = capture.release() {
                warn!(error = %e, "Failed to release output capture");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_capture_collects_writes() {
        let capture = MemoryCapture::new();
        let mut out = capture.stdout();
        let mut err = capture.stderr();
        write!(out, "hello ").unwrap();
        write!(out, "world").unwrap();
        writeln!(err, "warning").unwrap();

        let mut scope = CaptureScope::new(Box::new(capture));
        let captured = scope.release().unwrap();

        assert_eq!(captured.stdout, "hello world");
        assert_eq!(captured.stderr, "warning\n");
    }

    #[test]
    fn test_release_happens_once() {
        let mut scope = CaptureScope::new(Box::new(MemoryCapture::new()));
        assert!(scope.is_active());

        scope.release().unwrap();
        assert!(!scope.is_active());
        assert!(matches!(scope.release(), Err(CaptureError::AlreadyReleased)));
    }

    struct CountingCapture(Arc<Mutex<u32>>);

    impl StreamCapture for CountingCapture {
        fn release(self: Box<Self>) -> Result<CapturedOutput, CaptureError> {
            *self.0.lock().unwrap() += 1;
            Ok(CapturedOutput::default())
        }
    }

    #[test]
    fn test_drop_releases_unreleased_capture() {
        let releases = Arc::new(Mutex::new(0));
        {
            let _scope = CaptureScope::new(Box::new(CountingCapture(releases.clone())));
        }
        assert_eq!(*releases.lock().unwrap(), 1);

        {
            let mut scope = CaptureScope::new(Box::new(CountingCapture(releases.clone())));
            scope.release().unwrap();
        }
        assert_eq!(*releases.lock().unwrap(), 2);
    }
}
