//! Where the system package tool reports what it is doing.

use crate::ui::prelude::*;

pub trait Output {
    fn info(&mut self, message: &str);
    fn warn(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Forwards to the global [`emit`] renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn info(&mut self, message: &str) {
        emit(Level::Info, "syspkg.info", message, None);
    }

    fn warn(&mut self, message: &str) {
        emit(Level::Warn, "syspkg.warn", message, None);
    }

    fn error(&mut self, message: &str) {
        emit(Level::Error, "syspkg.error", message, None);
    }
}

/// Collects every line in memory. Clones share the same buffer, so a
/// test can keep one handle and give the other to the tool.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    lines: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.lines.borrow().join("\n")
    }

    fn push(&mut self, prefix: &str, message: &str) {
        self.lines.borrow_mut().push(format!("{}{}", prefix, message));
    }
}

impl Output for BufferOutput {
    fn info(&mut self, message: &str) {
        self.push("", message);
    }

    fn warn(&mut self, message: &str) {
        self.push("WARN: ", message);
    }

    fn error(&mut self, message: &str) {
        self.push("ERROR: ", message);
    }
}
