// src/packages/exec.rs

//! Subprocess execution for package manager queries
//!
//! Both adapters talk to the host package manager through `CommandRunner`
//! so that their parsing can be driven by canned output in tests.

use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, SilentProgress};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Size of each read from the package manager's stdout
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Captured result of one package manager invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// How the process ended, for diagnostics
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    fn from_parts(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

/// Runs external commands on behalf of an adapter
pub trait CommandRunner {
    /// Run to completion with stdout and stderr captured separately
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run to completion with stderr interleaved into stdout
    ///
    /// `stderr` of the returned output is always empty.
    fn run_merged(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands on the host, reporting stdout progress chunk by chunk
pub struct SystemRunner {
    progress: Box<dyn ProgressTracker>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::with_progress(Box::new(SilentProgress::new()))
    }

    pub fn with_progress(progress: Box<dyn ProgressTracker>) -> Self {
        Self { progress }
    }

    /// The tracker fed by `run`
    pub fn progress(&self) -> &dyn ProgressTracker {
        self.progress.as_ref()
    }

    fn spawn_error(program: &str, e: std::io::Error) -> Error {
        Error::OracleError(format!("Failed to run {}: {}. Is it installed?", program, e))
    }

    fn read_chunked(&self, mut reader: impl Read) -> Result<Vec<u8>> {
        let mut everything = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            everything.extend_from_slice(&chunk[..n]);
            self.progress.increment(n as u64);
        }
        Ok(everything)
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::OracleError(format!("No stdout pipe for {}", program)))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::OracleError(format!("No stderr pipe for {}", program)))?;

        // Drain stderr on the side so a chatty manager cannot fill the pipe
        // while stdout is still being read.
        let name = program.to_string();
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf) {
                debug!("Reading stderr of {} failed, diagnostics may be truncated: {}", name, e);
            }
            buf
        });

        let out = self.read_chunked(stdout)?;
        let status = child.wait()?;
        let err = stderr_reader.join().unwrap_or_default();

        Ok(CommandOutput::from_parts(status, &out, &err))
    }

    fn run_merged(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("Running {} {} (stderr merged)", program, args.join(" "));

        let (reader, writer) = std::io::pipe()?;
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);

        let mut child = command.spawn().map_err(|e| Self::spawn_error(program, e))?;
        // The command still holds the write ends; EOF only arrives once they close.
        drop(command);

        let out = self.read_chunked(reader)?;
        let status = child.wait()?;

        Ok(CommandOutput::from_parts(status, &out, &[]))
    }
}
