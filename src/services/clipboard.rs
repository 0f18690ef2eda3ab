use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8PathBuf;
use std::io::{self, IsTerminal, Write};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// How long a clipboard helper process may take before the native tier gives up.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from a clipboard tier. Never returned by [`ClipboardService`].
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard is unavailable")]
    Unavailable,

    #[error("Clipboard I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Clipboard command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

/// Asynchronous, platform-native clipboard write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NativeClipboard: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the native mechanism exists and may be used in this session.
    fn is_available(&self) -> bool;

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Synchronous last-resort copy. Reports success as a plain boolean.
#[cfg_attr(test, mockall::automock)]
pub trait FallbackClipboard: Send + Sync {
    fn is_available(&self) -> bool;
    fn copy_text(&self, text: &str) -> bool;
}

/// Program plus arguments that reads clipboard contents from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Locate `program` on `PATH`.
fn find_on_path(program: &str) -> Option<Utf8PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .filter_map(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .flat_map(|dir| {
            [
                dir.join(program),
                dir.join(format!("{}.exe", program)),
            ]
        })
        .find(|candidate| candidate.is_file())
}

/// Native tier: pipes text into the platform clipboard helper.
///
/// | Platform | Helper |
/// |----------|--------|
/// | macOS    | `pbcopy` |
/// | Windows  | `clip` |
/// | Wayland  | `wl-copy` |
/// | X11      | `xclip -selection clipboard`, then `xsel --clipboard --input` |
///
/// On Linux a helper is only used when a graphical session is present
/// (`WAYLAND_DISPLAY` or `DISPLAY`).
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    command: Option<ClipboardCommand>,
}

impl CommandClipboard {
    /// Pick the helper for the current platform and session.
    pub fn detect() -> Self {
        let candidates: Vec<ClipboardCommand> = if cfg!(target_os = "macos") {
            vec![ClipboardCommand::new("pbcopy", &[])]
        } else if cfg!(target_os = "windows") {
            vec![ClipboardCommand::new("clip", &[])]
        } else {
            let mut candidates = Vec::new();
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                candidates.push(ClipboardCommand::new("wl-copy", &[]));
            }
            if std::env::var_os("DISPLAY").is_some() {
                candidates.push(ClipboardCommand::new("xclip", &["-selection", "clipboard"]));
                candidates.push(ClipboardCommand::new("xsel", &["--clipboard", "--input"]));
            }
            candidates
        };

        let command = candidates
            .into_iter()
            .find(|c| find_on_path(&c.program).is_some());

        match &command {
            Some(c) => tracing::debug!("Native clipboard helper: {}", c.program),
            None => tracing::debug!("No native clipboard helper found"),
        }

        Self { command }
    }

    /// Use a specific helper, bypassing detection.
    pub fn with_command(command: ClipboardCommand) -> Self {
        Self {
            command: Some(command),
        }
    }

    /// A native tier that is never available.
    pub fn disabled() -> Self {
        Self { command: None }
    }

    pub fn command(&self) -> Option<&ClipboardCommand> {
        self.command.as_ref()
    }
}

#[async_trait]
impl NativeClipboard for CommandClipboard {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let command = self.command.as_ref().ok_or(ClipboardError::Unavailable)?;

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let status = timeout(COMMAND_TIMEOUT, child.wait())
            .await
            .map_err(|_| ClipboardError::CommandFailed {
                command: command.program.clone(),
                reason: format!("timed out after {:?}", COMMAND_TIMEOUT),
            })??;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::CommandFailed {
                command: command.program.clone(),
                reason: status.to_string(),
            })
        }
    }
}

/// Fallback tier: asks the terminal to set the selection with an OSC 52 escape sequence.
pub struct Osc52Clipboard<W: Write + Send> {
    writer: Mutex<W>,
    terminal: bool,
}

impl Osc52Clipboard<io::Stderr> {
    /// Write to stderr; available only when stderr is a terminal.
    pub fn stderr() -> Self {
        let stderr = io::stderr();
        let terminal = stderr.is_terminal();
        Self {
            writer: Mutex::new(stderr),
            terminal,
        }
    }
}

impl<W: Write + Send> Osc52Clipboard<W> {
    /// Write to an arbitrary sink, treated as a terminal.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            terminal: true,
        }
    }

    /// The escape sequence that sets the clipboard selection to `text`.
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> FallbackClipboard for Osc52Clipboard<W> {
    fn is_available(&self) -> bool {
        self.terminal
    }

    fn copy_text(&self, text: &str) -> bool {
        if !self.terminal {
            return false;
        }

        let Ok(mut writer) = self.writer.lock() else {
            return false;
        };

        writer
            .write_all(Self::sequence(text).as_bytes())
            .and_then(|_| writer.flush())
            .is_ok()
    }
}

/// Copies text to the system clipboard, native tier first, fallback second.
///
/// Callers get one boolean. Which tier succeeded is only visible in the logs.
pub struct ClipboardService {
    native: Box<dyn NativeClipboard>,
    fallback: Box<dyn FallbackClipboard>,
}

impl ClipboardService {
    pub fn new(native: Box<dyn NativeClipboard>, fallback: Box<dyn FallbackClipboard>) -> Self {
        Self { native, fallback }
    }

    /// Detected platform helper plus OSC 52 on stderr.
    pub fn system() -> Self {
        Self::new(
            Box::new(CommandClipboard::detect()),
            Box::new(Osc52Clipboard::stderr()),
        )
    }

    pub fn is_available(&self) -> bool {
        self.native.is_available() || self.fallback.is_available()
    }

    /// Copy `text`. Returns `false` when neither tier managed it.
    pub async fn copy(&self, text: &str) -> bool {
        if self.native.is_available() {
            match self.native.write_text(text).await {
                Ok(()) => {
                    tracing::debug!("Copied {} bytes via {}", text.len(), self.native.name());
                    return true;
                }
                Err(e) => {
                    tracing::warn!("Native clipboard write failed, trying fallback: {}", e);
                }
            }
        }

        if !self.fallback.is_available() {
            tracing::warn!("Clipboard unavailable: {}", ClipboardError::Unavailable);
            return false;
        }

        let copied = self.fallback.copy_text(text);
        if copied {
            tracing::debug!("Copied {} bytes via terminal fallback", text.len());
        } else {
            tracing::warn!("Fallback clipboard copy failed");
        }
        copied
    }
}
