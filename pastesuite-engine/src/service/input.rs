//! Input capture
//!
//! Reads the currently selected text and the clipboard. Selected text comes
//! from the primary selection where the platform has one; otherwise a
//! [`CopyTrigger`] sends the copy shortcut and the clipboard is polled
//! until the copied text shows up.

use pastesuite_core::domain::input::ClipboardImage;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub trait InputCapture: Send + Sync {
    /// Text selected in the focused application, if any
    fn get_selected_text(&self) -> Option<String>;

    /// Clipboard text, empty when there is none
    fn read_clipboard_text(&self) -> String;

    fn read_clipboard_image(&self) -> Option<ClipboardImage>;
}

/// Makes the focused application copy its selection
pub trait CopyTrigger: Send + Sync {
    fn send_copy(&self) -> anyhow::Result<()>;
}

/// Runs an external program (e.g. `xdotool key ctrl+c`) to send the copy shortcut
#[derive(Debug, Clone)]
pub struct CommandCopyTrigger {
    program: String,
    args: Vec<String>,
}

impl CommandCopyTrigger {
    /// Parses a whitespace-separated command line
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl CopyTrigger for CommandCopyTrigger {
    fn send_copy(&self) -> anyhow::Result<()> {
        let status = Command::new(&self.program).args(&self.args).status()?;
        if !status.success() {
            anyhow::bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Sends the platform copy shortcut through `enigo`
#[cfg(feature = "native-input")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EnigoCopyTrigger;

#[cfg(feature = "native-input")]
impl CopyTrigger for EnigoCopyTrigger {
    fn send_copy(&self) -> anyhow::Result<()> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("Failed to open input device: {}", e))?;
        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| anyhow::anyhow!("Failed to press modifier: {}", e))?;
        let clicked = enigo.key(Key::Unicode('c'), Direction::Click);
        // release even when the click failed, or the modifier stays stuck
        let released = enigo.key(modifier, Direction::Release);
        clicked.map_err(|e| anyhow::anyhow!("Failed to send copy shortcut: {}", e))?;
        released.map_err(|e| anyhow::anyhow!("Failed to release modifier: {}", e))?;
        Ok(())
    }
}

/// Polling schedule used while waiting for a copy to land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(50),
        }
    }
}

/// Captures the selection by copying it to the clipboard.
///
/// The clipboard is cleared first so a successful copy can be detected. If
/// nothing arrives within the retry budget the previous clipboard content is
/// restored and `None` is returned; a successful capture stays on the
/// clipboard, as a normal copy would.
pub fn capture_via_copy(
    read: &mut dyn FnMut() -> String,
    write: &mut dyn FnMut(&str),
    copy: &dyn CopyTrigger,
    retry: RetryPolicy,
) -> Option<String> {
    let original = read();
    write("");

    if let Err(e) = copy.send_copy() {
        warn!("Failed to send copy shortcut: {:#}", e);
        write(&original);
        return None;
    }

    for attempt in 0..retry.attempts {
        let captured = read();
        if !captured.is_empty() {
            debug!("Selection captured after {} poll(s)", attempt + 1);
            return Some(captured);
        }
        thread::sleep(retry.delay);
    }

    write(&original);
    None
}

/// System clipboard access through `arboard`
pub struct ArboardCapture {
    copy: Option<Box<dyn CopyTrigger>>,
    retry: RetryPolicy,
}

impl ArboardCapture {
    pub fn new() -> Self {
        Self {
            copy: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Enables selection capture through a simulated copy
    pub fn with_copy_trigger(mut self, copy: Box<dyn CopyTrigger>) -> Self {
        self.copy = Some(copy);
        self
    }

    fn clipboard() -> Option<arboard::Clipboard> {
        match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("Clipboard unavailable: {}", e);
                None
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn primary_selection() -> Option<String> {
        use arboard::{GetExtLinux, LinuxClipboardKind};

        let mut clipboard = Self::clipboard()?;
        clipboard
            .get()
            .clipboard(LinuxClipboardKind::Primary)
            .text()
            .ok()
            .filter(|t| !t.is_empty())
    }

    #[cfg(not(target_os = "linux"))]
    fn primary_selection() -> Option<String> {
        None
    }
}

impl Default for ArboardCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCapture for ArboardCapture {
    fn get_selected_text(&self) -> Option<String> {
        if let Some(text) = Self::primary_selection() {
            return Some(text);
        }

        let copy = self.copy.as_deref()?;
        let mut clipboard = Self::clipboard()?;
        let mut read = || Self::clipboard().and_then(|mut c| c.get_text().ok()).unwrap_or_default();
        let mut write = |text: &str| {
            if let Err(e) = clipboard.set_text(text) {
                warn!("Failed to write clipboard: {}", e);
            }
        };
        capture_via_copy(&mut read, &mut write, copy, self.retry)
    }

    fn read_clipboard_text(&self) -> String {
        Self::clipboard()
            .and_then(|mut c| c.get_text().ok())
            .unwrap_or_default()
    }

    fn read_clipboard_image(&self) -> Option<ClipboardImage> {
        let mut clipboard = Self::clipboard()?;
        let image = clipboard.get_image().ok()?;
        let image = ClipboardImage::new(image.width, image.height, image.bytes.into_owned());
        (!image.is_empty()).then_some(image)
    }
}

/// Fixed input, for tests and scripted runs
#[derive(Debug, Clone, Default)]
pub struct StaticCapture {
    pub selected_text: Option<String>,
    pub clipboard_text: String,
    pub clipboard_image: Option<ClipboardImage>,
}

impl StaticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    pub fn with_clipboard(mut self, text: impl Into<String>) -> Self {
        self.clipboard_text = text.into();
        self
    }

    pub fn with_image(mut self, image: ClipboardImage) -> Self {
        self.clipboard_image = Some(image);
        self
    }
}

impl InputCapture for StaticCapture {
    fn get_selected_text(&self) -> Option<String> {
        self.selected_text.clone()
    }

    fn read_clipboard_text(&self) -> String {
        self.clipboard_text.clone()
    }

    fn read_clipboard_image(&self) -> Option<ClipboardImage> {
        self.clipboard_image.clone()
    }
}
