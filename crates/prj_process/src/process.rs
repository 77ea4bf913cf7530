use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::pin::Pin;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::task::{Context, Poll};
use std::thread;

use command_dispatcher::CommandEvent;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::CommandConfig;
use crate::output::{log_command_output, OutputStream};

/// A request to run the configured program with some arguments
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    config: CommandConfig,
    args: Vec<OsString>,
}

impl ProcessCommand {
    pub fn new(config: CommandConfig) -> Self {
        Self {
            config,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// A printable form of the command line, used in logs and messages
    pub fn display(&self) -> String {
        std::iter::once(self.config.program.as_os_str())
            .chain(self.config.args_prefix.iter().map(|arg| OsStr::new(arg.as_str())))
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start the program.
    ///
    /// An invalid configuration or a program that cannot be started yields a
    /// failed response instead of an error, like a program that exits with a
    /// non-zero code.
    pub fn spawn(self) -> ProcessOperation {
        let command_line = self.display();
        if let Err(err) = self.config.validate() {
            error!(command = %command_line, error = %err, "Refusing to run misconfigured command");
            return ProcessOperation::finished(Err(format!("invalid command configuration: {err}")));
        }
        debug!(command = %command_line, "Running command");

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args_prefix)
            .args(&self.args)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        match command.spawn() {
            Ok(child) => ProcessOperation::supervise(child, self.program_name()),
            Err(err) => {
                error!(command = %command_line, error = %err, "Failed to start command");
                ProcessOperation::finished(Err(format!(
                    "failed to start `{}`: {err}",
                    self.program_name()
                )))
            }
        }
    }

    fn program_name(&self) -> String {
        self.config.program.display().to_string()
    }
}

enum ProcessMessage {
    Stdout(String),
    Exited(Result<String, String>),
}

/// The running program as a command operation.
///
/// Each poll drains the stdout lines read since the previous poll into one
/// progress event and is pending when nothing new arrived. Once the program
/// exited, the terminal response carries the collected stderr: as payload
/// for exit code 0, as error message otherwise.
pub struct ProcessOperation {
    messages: Option<mpsc::UnboundedReceiver<ProcessMessage>>,
    exit: Option<Result<String, String>>,
    done: bool,
}

impl ProcessOperation {
    fn supervise(mut child: Child, program: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::spawn(move || {
            let stderr_reader = thread::spawn(move || match stderr {
                Some(stderr) => read_lines(stderr, OutputStream::Stderr, |_| {}),
                None => Vec::new(),
            });

            if let Some(stdout) = stdout {
                read_lines(stdout, OutputStream::Stdout, |line| {
                    let _ = tx.send(ProcessMessage::Stdout(line.to_string()));
                });
            }

            let stderr_lines = stderr_reader.join().unwrap_or_default();
            let outcome = match child.wait() {
                Ok(status) => exit_outcome(&program, status, stderr_lines.join("\n")),
                Err(err) => Err(format!("failed to wait for `{program}`: {err}")),
            };
            let _ = tx.send(ProcessMessage::Exited(outcome));
        });

        Self {
            messages: Some(rx),
            exit: None,
            done: false,
        }
    }

    fn finished(outcome: Result<String, String>) -> Self {
        Self {
            messages: None,
            exit: Some(outcome),
            done: false,
        }
    }

    fn into_event(outcome: Result<String, String>) -> CommandEvent<String> {
        match outcome {
            Ok(stderr) => CommandEvent::succeeded(stderr),
            Err(message) => CommandEvent::failed(message),
        }
    }
}

impl Stream for ProcessOperation {
    type Item = CommandEvent<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let mut lines = Vec::new();
        if let Some(messages) = self.messages.as_mut() {
            let mut exit = None;
            loop {
                match messages.poll_recv(cx) {
                    Poll::Ready(Some(ProcessMessage::Stdout(line))) => lines.push(line),
                    Poll::Ready(Some(ProcessMessage::Exited(outcome))) => {
                        exit = Some(outcome);
                        break;
                    }
                    Poll::Ready(None) => {
                        warn!("Command supervisor stopped without reporting an exit status");
                        exit = Some(Err("the command stopped unexpectedly".to_string()));
                        break;
                    }
                    Poll::Pending => break,
                }
            }
            if let Some(outcome) = exit {
                self.messages = None;
                self.exit = Some(outcome);
            }
        }

        if !lines.is_empty() {
            return Poll::Ready(Some(CommandEvent::Progress(lines)));
        }

        match self.exit.take() {
            Some(outcome) => {
                self.done = true;
                Poll::Ready(Some(Self::into_event(outcome)))
            }
            None => Poll::Pending,
        }
    }
}

fn exit_outcome(program: &str, status: ExitStatus, stderr: String) -> Result<String, String> {
    if status.success() {
        return Ok(stderr);
    }

    debug!(program, ?status, "Command exited unsuccessfully");
    if !stderr.trim().is_empty() {
        return Err(stderr);
    }

    Err(match status.code() {
        Some(code) => format!("`{program}` exited with status code {code}"),
        None => format!("`{program}` was terminated by a signal"),
    })
}

/// Read `reader` line by line until it closes, logging and forwarding each
/// line. Returns every line read.
fn read_lines<R: Read>(reader: R, stream: OutputStream, mut on_line: impl FnMut(&str)) -> Vec<String> {
    let mut lines = Vec::new();
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                log_command_output(stream, &line);
                on_line(&line);
                lines.push(line);
            }
            Err(err) => {
                warn!(?stream, error = %err, "Failed to read command output");
                break;
            }
        }
    }
    lines
}
