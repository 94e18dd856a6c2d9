use std::sync::{
    mpsc,
    Mutex,
};

/// Notifications the core raises for the UI to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KanjiEvent {
    LevelComplete { level: String },
    MasteryRecorded { character: String },
    BackupCreated { timestamp: i64 },
    BackupFailed { reason: String },
}

impl KanjiEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            KanjiEvent::LevelComplete { .. } => "level_complete",
            KanjiEvent::MasteryRecorded { .. } => "mastery_recorded",
            KanjiEvent::BackupCreated { .. } => "backup_created",
            KanjiEvent::BackupFailed { .. } => "backup_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<KanjiEvent>,
}

impl EventSender {
    /// Fire and forget; a dropped bus just means nobody is listening.
    pub fn emit(&self, event: KanjiEvent) {
        tracing::debug!(event = event.event_type(), "emitting event");
        let _ = self.sender.send(event);
    }
}

pub struct EventBus {
    sender: mpsc::Sender<KanjiEvent>,
    receiver: Mutex<mpsc::Receiver<KanjiEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver: Mutex::new(receiver) }
    }

    pub fn sender(&self) -> EventSender {
        EventSender { sender: self.sender.clone() }
    }

    pub fn poll_events(&self) -> Vec<KanjiEvent> {
        let mut events = Vec::new();

        if let Ok(receiver) = self.receiver.lock() {
            while let Ok(event) = receiver.try_recv() {
                events.push(event);
            }
        }

        events
    }
}
