//! Usage: Append-only console log, the user-visible progress record.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsoleLog {
    entries: Vec<String>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "console", "{}", message);
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = ConsoleLog::new();
        log.log("first");
        log.log("second");
        log.log(String::from("third"));
        assert_eq!(log.entries(), ["first", "second", "third"]);
        assert_eq!(log.last(), Some("third"));
        assert_eq!(log.len(), 3);
    }
}
