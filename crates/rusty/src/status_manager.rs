use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageType {
    fn lifetime(self) -> Duration {
        match self {
            MessageType::Info => Duration::from_secs(3),
            MessageType::Success => Duration::from_secs(2),
            MessageType::Warning => Duration::from_secs(5),
            MessageType::Error => Duration::from_secs(7),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub content: String,
    pub message_type: MessageType,
    pub created_at: Instant,
    pub auto_clear_duration: Option<Duration>,
}

impl StatusMessage {
    pub fn new(content: String, message_type: MessageType) -> Self {
        Self {
            content,
            message_type,
            created_at: Instant::now(),
            auto_clear_duration: Some(message_type.lifetime()),
        }
    }

    /// A message that stays until replaced, such as a save prompt.
    pub fn sticky(content: String, message_type: MessageType) -> Self {
        Self {
            auto_clear_duration: None,
            ..Self::new(content, message_type)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.auto_clear_duration
            .map(|duration| self.created_at.elapsed() > duration)
            .unwrap_or(false)
    }
}

/// The message line below the request status.
#[derive(Debug, Clone, Default)]
pub struct StatusManager {
    current_message: Option<StatusMessage>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, message: String, message_type: MessageType) {
        match message_type {
            MessageType::Error => log::warn!("{}", message),
            _ => log::debug!("{}", message),
        }
        self.current_message = Some(StatusMessage::new(message, message_type));
    }

    pub fn set_sticky(&mut self, message: String, message_type: MessageType) {
        self.current_message = Some(StatusMessage::sticky(message, message_type));
    }

    pub fn clear(&mut self) {
        self.current_message = None;
    }

    /// Drops the current message once it has expired.
    pub fn update(&mut self) {
        if self.current_message.as_ref().is_some_and(StatusMessage::is_expired) {
            self.current_message = None;
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current_message.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_message_types_and_lifetimes() {
        let mut manager = StatusManager::new();
        assert!(manager.current().is_none());

        manager.set("saved".to_string(), MessageType::Success);
        let message = manager.current().unwrap();
        assert_eq!(message.message_type, MessageType::Success);
        assert_eq!(message.auto_clear_duration, Some(Duration::from_secs(2)));
        assert!(!message.is_expired());

        manager.set("boom".to_string(), MessageType::Error);
        assert_eq!(manager.current().unwrap().content, "boom");
    }

    #[test]
    fn test_sticky_message_survives_update() {
        let mut manager = StatusManager::new();
        manager.set_sticky("Save changes? (y/n/c)".to_string(), MessageType::Warning);
        manager.update();
        assert!(manager.current().unwrap().auto_clear_duration.is_none());

        manager.clear();
        assert!(manager.current().is_none());
    }

    #[test]
    fn test_update_expired_message() {
        let mut manager = StatusManager::new();
        let mut message = StatusMessage::new("Test".to_string(), MessageType::Info);
        message.auto_clear_duration = Some(Duration::from_millis(1));
        manager.current_message = Some(message);

        thread::sleep(Duration::from_millis(10));
        manager.update();
        assert!(manager.current().is_none());
    }
}
