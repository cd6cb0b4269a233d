use std::cell::RefCell;

/// Fire-and-forget channel for user-facing success/failure messages.
pub trait Notifier {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Prints to the terminal, like the rest of the CLI output.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn failure(&self, message: &str) {
        eprintln!("Error: {}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

/// Keeps every notice in order. The browse view shows the latest one in its status line.
#[derive(Debug, Default)]
pub struct MessageLog {
    notices: RefCell<Vec<Notice>>,
}

impl MessageLog {
    pub fn latest(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    pub fn all(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.notices.borrow().iter().filter(|n| n.level == level).count()
    }

    fn push(&self, level: Level, message: &str) {
        self.notices.borrow_mut().push(Notice {
            level,
            message: message.to_string(),
        });
    }
}

impl Notifier for MessageLog {
    fn success(&self, message: &str) {
        self.push(Level::Success, message);
    }

    fn failure(&self, message: &str) {
        self.push(Level::Failure, message);
    }
}
