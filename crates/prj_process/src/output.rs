use std::env;

use once_cell::sync::Lazy;

/// Environment variable that forces command output to be echoed to stderr,
/// regardless of the tracing level.
const PRINT_OUTPUT_ENV: &str = "PRJ_PRINT_COMMAND_OUTPUT";

/// Controls whether command output should also be echoed directly to stderr.
static FORCE_OUTPUT_PRINT: Lazy<bool> = Lazy::new(|| {
    env::var(PRINT_OUTPUT_ENV)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
});

fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    !matches!(value.as_str(), "" | "0" | "false" | "off")
}

/// Which stream of the child process a line was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputStream {
    Stdout,
    Stderr,
}

pub(crate) fn log_command_output(stream: OutputStream, line: &str) {
    if tracing::event_enabled!(target: "prj::process::output", tracing::Level::DEBUG) {
        match stream {
            OutputStream::Stdout => tracing::debug!(target: "prj::process::output", "{line}"),
            OutputStream::Stderr => tracing::debug!(target: "prj::process::output", stderr = true, "{line}"),
        }
    }

    if *FORCE_OUTPUT_PRINT {
        let prefix = match stream {
            OutputStream::Stdout => "prj",
            OutputStream::Stderr => "prj:err",
        };
        eprintln!("[{prefix}] {line}");
    }
}

/// Split the output of a listing command into its `---` separated
/// documents.
///
/// Documents are trimmed and empty ones are dropped.
pub fn split_documents(output: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in output.lines() {
        if line.trim_end() == "---" {
            push_document(&mut documents, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_document(&mut documents, &current);

    documents
}

fn push_document(documents: &mut Vec<String>, document: &str) {
    let trimmed = document.trim();
    if !trimmed.is_empty() {
        documents.push(trimmed.to_string());
    }
}
