//! Host-side collaborators: the display slot, notifications and the
//! wall clock, plus in-memory implementations for headless hosts.

/// The single widget surface shared by the clock and the reveal.
pub trait DisplaySlot {
    /// Create the widget, or update it if `code` is already registered.
    fn register(&mut self, code: &str, name: &str, width_px: u32);

    fn set_content(&mut self, title: &str, body: &str);

    /// Current title, or `None` when the host has no widget registered.
    fn title(&self) -> Option<String>;
}

/// Fire-and-forget desktop notification.
pub trait Notifier {
    fn notify(&mut self, title: &str, subtitle: &str, body: &str, duration_ms: u64);
}

/// Source of the clock label shown while idle.
pub trait TimeSource {
    fn label(&self) -> String;
}

/// Local wall-clock time as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn label(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// A fixed label, for tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl TimeSource for FixedClock {
    fn label(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub code: String,
    pub name: String,
    pub width_px: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayWrite {
    pub title: String,
    pub body: String,
}

/// Display slot that keeps every write in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    writes: Vec<DisplayWrite>,
    widget: Option<Registration>,
    registrations: usize,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> &[DisplayWrite] {
        &self.writes
    }

    pub fn last(&self) -> Option<&DisplayWrite> {
        self.writes.last()
    }

    pub fn widget(&self) -> Option<&Registration> {
        self.widget.as_ref()
    }

    pub fn width(&self) -> Option<u32> {
        self.widget.as_ref().map(|w| w.width_px)
    }

    /// Number of `register` calls seen.
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    /// Simulate the host dropping the widget.
    pub fn unregister(&mut self) {
        self.widget = None;
    }

    pub fn count_titled(&self, title: &str) -> usize {
        self.writes.iter().filter(|w| w.title == title).count()
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl DisplaySlot for RecordingDisplay {
    fn register(&mut self, code: &str, name: &str, width_px: u32) {
        self.widget = Some(Registration {
            code: code.to_string(),
            name: name.to_string(),
            width_px,
        });
        self.registrations += 1;
    }

    fn set_content(&mut self, title: &str, body: &str) {
        self.writes.push(DisplayWrite {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn title(&self) -> Option<String> {
        self.widget.as_ref()?;
        Some(
            self.writes
                .last()
                .map(|w| w.title.clone())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub duration_ms: u64,
}

/// Notifier that keeps every notification in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Vec<Notification>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[Notification] {
        &self.sent
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, title: &str, subtitle: &str, body: &str, duration_ms: u64) {
        self.sent.push(Notification {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            body: body.to_string(),
            duration_ms,
        });
    }
}
