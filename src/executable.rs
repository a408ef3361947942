//! Programs shipped inside materialized resources

use crate::error::{GetpackError, GetpackResult};
use crate::resource::descriptor::ATTR_EXECUTABLE;
use crate::resource::ResourceHandle;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// A runnable program inside a resource
///
/// The program path comes from the `executable` attribute (relative to the
/// install root) and falls back to the resource name.
#[derive(Debug)]
pub struct Executable {
    handle: ResourceHandle,
}

impl Executable {
    pub fn new(handle: ResourceHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Program path relative to the install root
    pub fn relative_path(&self) -> PathBuf {
        let descriptor = self.handle.descriptor();
        let program = descriptor
            .extra(ATTR_EXECUTABLE)
            .unwrap_or_else(|| descriptor.name());
        with_platform_extension(program)
    }

    /// Activate the resource and locate the program
    pub fn program(&self) -> GetpackResult<PathBuf> {
        let program = self.handle.activate()?.join(self.relative_path());
        if !program.is_file() {
            return Err(GetpackError::ExecutableNotFound(program));
        }
        Ok(program)
    }

    /// Command for the program, for callers that manage stdio themselves
    pub fn command<I, S>(&self, args: I) -> GetpackResult<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(self.program()?);
        command.args(args);
        Ok(command)
    }

    /// Run the program and return its standard output
    pub fn run<I, S>(&self, args: I) -> GetpackResult<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.run_with_input(args, None)
    }

    /// Run the program with `input` on standard input
    ///
    /// A non-zero exit status is an error carrying the captured stderr.
    pub fn run_with_input<I, S>(&self, args: I, input: Option<&[u8]>) -> GetpackResult<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = self.command(args)?;
        let command_line = format!("{:?}", command);
        debug!("Running {}", command_line);

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GetpackError::command_failed(&command_line, e))?;

        // fed from its own thread so a child filling stdout cannot stall on stdin;
        // dropping the pipe closes it, so programs reading to EOF terminate
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.map(<[u8]>::to_vec);
            thread::spawn(move || match input {
                Some(input) => stdin.write_all(&input),
                None => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| GetpackError::command_failed(&command_line, e))?;

        if let Some(writer) = writer {
            let written = writer.join().map_err(|_| {
                GetpackError::Internal(format!("stdin writer for {} panicked", command_line))
            })?;
            match written {
                Ok(()) => {}
                // the program exited without reading all of its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(GetpackError::command_failed(&command_line, e)),
            }
        }

        if !output.status.success() {
            return Err(GetpackError::CommandExecution {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn with_platform_extension(program: &str) -> PathBuf {
    if cfg!(windows) && !program.to_ascii_lowercase().ends_with(".exe") {
        PathBuf::from(format!("{}.exe", program))
    } else {
        PathBuf::from(program)
    }
}
