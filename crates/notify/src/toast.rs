/// Default toast display duration in milliseconds.
const DEFAULT_DURATION_MS: u64 = 4000;

/// Error toast display duration in milliseconds (longer for visibility).
const ERROR_DURATION_MS: u64 = 6000;

/// The visual category of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastType {
    /// How long a toast of this type stays on screen by default.
    pub fn default_duration_ms(self) -> u64 {
        match self {
            Self::Error => ERROR_DURATION_MS,
            Self::Success | Self::Warning | Self::Info => DEFAULT_DURATION_MS,
        }
    }
}

/// A single queued notification.
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub toast_type: ToastType,
    pub title: String,
    pub duration_ms: u64,
}

/// In-memory toast queue with monotonic ID assignment.
///
/// Dismissal timing belongs to whatever renders the toasts; this only
/// holds them in arrival order.
#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a toast with an explicit duration. Returns the assigned ID.
    pub fn push(&mut self, toast_type: ToastType, title: impl Into<String>, duration_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            toast_type,
            title: title.into(),
            duration_ms,
        });
        id
    }

    /// Push a toast with its type's default duration.
    pub fn push_default(&mut self, toast_type: ToastType, title: impl Into<String>) -> u64 {
        self.push(toast_type, title, toast_type.default_duration_ms())
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Take every toast out of the queue. IDs keep counting from where they were.
    pub fn drain(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }
}
