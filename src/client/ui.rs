use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn success(&mut self, message: impl Into<String>) {
        self.items.push(Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.items.push(Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    pub fn last(&self) -> Option<&Notice> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.items)
    }
}

/// Blocking user prompts: confirmation before destructive actions and
/// single-line text input.
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
    async fn ask(&self, message: &str) -> Option<String>;
}

/// Non-interactive prompt with canned answers, for headless use.
#[derive(Debug, Clone, Default)]
pub struct FixedPrompt {
    pub confirm: bool,
    pub answer: Option<String>,
}

impl FixedPrompt {
    pub fn accepting() -> Self {
        FixedPrompt {
            confirm: true,
            answer: None,
        }
    }

    pub fn answering(answer: &str) -> Self {
        FixedPrompt {
            confirm: true,
            answer: Some(answer.to_string()),
        }
    }
}

#[async_trait]
impl Prompt for FixedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(message, answer = self.confirm, "confirm prompt");
        self.confirm
    }

    async fn ask(&self, message: &str) -> Option<String> {
        tracing::debug!(message, "text prompt");
        self.answer.clone()
    }
}

/// Colour keyed to a value's meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn for_amount(amount: f64) -> Self {
        if amount > 0.0 {
            Tone::Positive
        } else if amount < 0.0 {
            Tone::Negative
        } else {
            Tone::Neutral
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tone::Positive => "#16a34a",
            Tone::Negative => "#dc2626",
            Tone::Neutral => "#6b7280",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Empty,
    Populated,
}

impl ViewState {
    pub fn of<T>(loading: bool, items: &[T]) -> Self {
        if loading {
            ViewState::Loading
        } else if items.is_empty() {
            ViewState::Empty
        } else {
            ViewState::Populated
        }
    }
}
