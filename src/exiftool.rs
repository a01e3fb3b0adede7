use crate::error::ExifToolError;
use crate::tags::TagSet;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;

const STDERR_POLL_INTERVAL: Duration = Duration::from_millis(5);
const STDERR_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Anything that can embed a [`TagSet`] into a file in place.
///
/// The stager only needs this one operation, so the pipeline is generic over it
/// rather than tied to a running `exiftool` process.
pub trait TagWriter {
    /// Writes `tags` into the file at `path`, replacing it without leaving a backup.
    fn embed(&mut self, path: &Path, tags: &TagSet) -> Result<(), ExifToolError>;
}

impl<T: TagWriter + ?Sized> TagWriter for &mut T {
    fn embed(&mut self, path: &Path, tags: &TagSet) -> Result<(), ExifToolError> {
        (**self).embed(path, tags)
    }
}

/// A persistent `exiftool` process in `-stay_open` mode.
///
/// Spawned once per run and shared by every file. Call [`ExifTool::shutdown`]
/// when the run is over; dropping it also terminates the process.
#[derive(Debug)]
pub struct ExifTool {
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    stderr_receiver: Receiver<String>,
    child: Child,
    closed: bool,
}

impl ExifTool {
    /// Launches `exiftool` from `PATH`.
    pub fn new() -> Result<Self, ExifToolError> {
        Self::with_executable(Path::new("exiftool"))
    }

    /// Launches a specific `exiftool` executable.
    pub fn with_executable(exiftool_path: &Path) -> Result<Self, ExifToolError> {
        let mut child = Command::new(exiftool_path)
            .arg("-stay_open")
            .arg("True")
            .arg("-@")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExifToolError::ExifToolNotFound)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

        let (stderr_sender, stderr_receiver) = mpsc::channel();
        let stderr_reader = BufReader::new(stderr);
        thread::spawn(move || {
            for line in stderr_reader.lines().map_while(Result::ok) {
                if stderr_sender.send(line).is_err() {
                    break;
                }
            }
        });

        log::debug!("Started exiftool ({})", exiftool_path.display());

        Ok(Self {
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            stderr_receiver,
            child,
            closed: false,
        })
    }

    /// Sends one command and returns its raw stdout.
    ///
    /// Arguments go over stdin one per line, followed by `-execute`; the
    /// response ends at the `{ready}` marker. `Error:` lines on stderr turn
    /// into errors, `Warning:` lines are logged.
    pub fn execute_raw(&mut self, args: &[&str]) -> Result<Vec<u8>, ExifToolError> {
        // Stale lines from an earlier command must not be blamed on this one.
        while self.stderr_receiver.try_recv().is_ok() {}

        for arg in args {
            writeln!(self.stdin, "{}", arg)?;
        }
        writeln!(self.stdin, "-execute")?;
        self.stdin.flush()?;

        let stdout_bytes = self.read_response_until_ready()?;
        let stderr_lines = self.drain_stderr()?;

        let command_args = args.join(" ");
        for err_line in &stderr_lines {
            if let Some(filename) = err_line.strip_prefix("Error: File not found - ") {
                return Err(ExifToolError::FileNotFound {
                    path: PathBuf::from(filename.trim()),
                    command_args,
                });
            } else if err_line.contains("Error:") {
                return Err(ExifToolError::ExifToolProcess {
                    message: err_line.to_string(),
                    std_err: stderr_lines.join("\n"),
                    command_args,
                });
            } else if err_line.contains("Warning:") {
                log::warn!("ExifTool {}", err_line);
            }
        }

        Ok(stdout_bytes)
    }

    fn read_response_until_ready(&mut self) -> Result<Vec<u8>, ExifToolError> {
        let mut buffer = Vec::with_capacity(4096);
        let ready_marker_unix = b"{ready}\n";
        let ready_marker_win = b"{ready}\r\n";

        loop {
            let mut chunk = [0u8; 4096];
            let bytes_read = self.stdout.read(&mut chunk)?;

            if bytes_read == 0 {
                let stderr_lines = self.drain_stderr().unwrap_or_default();
                return if stderr_lines.is_empty() {
                    Err(ExifToolError::ProcessTerminated)
                } else {
                    Err(ExifToolError::ExifToolProcess {
                        message: "Process terminated unexpectedly".to_string(),
                        std_err: stderr_lines.join("\n"),
                        command_args: "<unknown - process terminated>".to_string(),
                    })
                };
            }

            buffer.extend_from_slice(&chunk[..bytes_read]);

            if buffer.ends_with(ready_marker_win) {
                buffer.truncate(buffer.len() - ready_marker_win.len());
                return Ok(buffer);
            }
            if buffer.ends_with(ready_marker_unix) {
                buffer.truncate(buffer.len() - ready_marker_unix.len());
                return Ok(buffer);
            }
        }
    }

    /// Collects stderr lines belonging to the last command.
    ///
    /// Stderr can trail stdout slightly, so this polls for a short window.
    fn drain_stderr(&mut self) -> Result<Vec<String>, ExifToolError> {
        let mut err_lines = Vec::new();
        let start_time = Instant::now();

        loop {
            match self.stderr_receiver.try_recv() {
                Ok(line) => err_lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(ExifToolError::StderrDisconnected),
            }
        }

        while start_time.elapsed() < STDERR_POLL_TIMEOUT {
            match self.stderr_receiver.try_recv() {
                Ok(line) => err_lines.push(line),
                Err(TryRecvError::Empty) => {
                    if !err_lines.is_empty() {
                        break;
                    }
                    thread::sleep(STDERR_POLL_INTERVAL);
                }
                Err(TryRecvError::Disconnected) => {
                    if err_lines.is_empty() {
                        return Err(ExifToolError::StderrDisconnected);
                    }
                    break;
                }
            }
        }

        Ok(err_lines)
    }

    /// Asks the process to leave stay-open mode.
    pub fn close(&mut self) -> Result<(), std::io::Error> {
        writeln!(self.stdin, "-stay_open")?;
        writeln!(self.stdin, "False")?;
        writeln!(self.stdin, "-execute")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Closes the process and waits for it to exit.
    pub fn shutdown(mut self) -> Result<ExitStatus, ExifToolError> {
        self.close()?;
        let status = self.child.wait()?;
        self.closed = true;
        log::debug!("exiftool exited with {status}");
        Ok(status)
    }

    /// Runs `exiftool -json {args...}` and parses the output.
    pub fn json_execute(&mut self, args: &[&str]) -> Result<Value, ExifToolError> {
        let mut cmd_args = vec!["-json"];
        cmd_args.extend_from_slice(args);
        let output_bytes = self.execute_raw(&cmd_args)?;
        if output_bytes.is_empty() {
            return Err(ExifToolError::UnexpectedFormat {
                path: args
                    .iter()
                    .find(|a| !a.starts_with('-'))
                    .unwrap_or(&"<unknown>")
                    .to_string(),
                command_args: cmd_args.join(" "),
            });
        }
        Ok(serde_json::from_slice(&output_bytes)?)
    }

    /// Metadata of a single file as the JSON object ExifTool prints for it.
    pub fn json(&mut self, file_path: &Path, extra_args: &[&str]) -> Result<Value, ExifToolError> {
        let path_str = file_path.to_string_lossy();
        let mut args = extra_args.to_vec();
        args.push(path_str.as_ref());

        let first = match self.json_execute(&args)? {
            Value::Array(items) => items.into_iter().next(),
            _ => None,
        };
        first.ok_or_else(|| ExifToolError::UnexpectedFormat {
            path: path_str.to_string(),
            command_args: args.join(" "),
        })
    }

    /// Reads the given tags of one file into `T`.
    pub fn read_tags<T: DeserializeOwned>(
        &mut self,
        file_path: &Path,
        tags: &[&str],
    ) -> Result<T, ExifToolError> {
        let tag_args: Vec<String> = tags.iter().map(|t| format!("-{}", t)).collect();
        let tag_args_str: Vec<&str> = tag_args.iter().map(String::as_str).collect();

        let value = self.json(file_path, &tag_args_str)?;
        serde_path_to_error::deserialize(value).map_err(ExifToolError::from)
    }

    /// Reads one tag and deserializes it. `Option<_>` targets yield `None` for missing tags.
    pub fn read_tag<T: DeserializeOwned>(
        &mut self,
        file_path: &Path,
        tag: &str,
    ) -> Result<T, ExifToolError> {
        let tag_arg = format!("-{}", tag);
        let metadata = self.json(file_path, &[&tag_arg])?;
        let value = metadata.get(tag).cloned().unwrap_or(Value::Null);
        let is_missing = value.is_null();

        serde_json::from_value(value).map_err(|error| {
            if is_missing {
                ExifToolError::TagNotFound {
                    path: file_path.to_path_buf(),
                    tag: tag.to_string(),
                }
            } else {
                ExifToolError::TagDeserialization {
                    path: file_path.to_path_buf(),
                    tag: tag.to_string(),
                    error,
                }
            }
        })
    }

    /// Writes every tag of `tags` to `file_path` in one command.
    ///
    /// Runs `exiftool [-ec] {-TAG=VALUE...} {extra_args...} {file_path}`. Values
    /// containing line breaks are C-escaped (`-ec`) since the stay-open
    /// protocol is line based.
    ///
    /// **Warning:** without `-overwrite_original` ExifTool leaves a
    /// `{filename}_original` backup next to the file.
    pub fn write_tags(
        &mut self,
        file_path: &Path,
        tags: &TagSet,
        extra_args: &[&str],
    ) -> Result<(), ExifToolError> {
        let args = write_args(file_path, tags, extra_args);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        // Output is just "1 image files updated".
        let _ = self.execute_raw(&args)?;
        Ok(())
    }
}

impl TagWriter for ExifTool {
    fn embed(&mut self, path: &Path, tags: &TagSet) -> Result<(), ExifToolError> {
        self.write_tags(path, tags, &["-overwrite_original"])
    }
}

/// Arguments for one write command: `[-ec] {-TAG=VALUE...} {extra_args...} {file_path}`.
///
/// If any value holds a line break, every value is C-escaped and `-ec` leads.
fn write_args(file_path: &Path, tags: &TagSet, extra_args: &[&str]) -> Vec<String> {
    let values: Vec<(&String, String)> = tags
        .iter()
        .map(|(tag, value)| (tag, value.to_string()))
        .collect();
    let needs_escape = values
        .iter()
        .any(|(_, v)| v.contains('\n') || v.contains('\r'));

    let mut args = Vec::with_capacity(values.len() + extra_args.len() + 2);
    if needs_escape {
        args.push("-ec".to_string());
    }
    args.extend(values.iter().map(|(tag, value)| {
        if needs_escape {
            format!("-{}={}", tag, c_escape(value))
        } else {
            format!("-{}={}", tag, value)
        }
    }));
    args.extend(extra_args.iter().map(|a| a.to_string()));
    args.push(file_path.to_string_lossy().into_owned());
    args
}

fn c_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
