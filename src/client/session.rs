use std::collections::HashMap;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Question as typed.
    pub question: String,
    /// Answer returned by the service.
    pub answer: String,
}

/// In-memory client state. Nothing here is persisted.
#[derive(Debug, Default)]
pub struct Session {
    selected: Option<String>,
    file_uploaded: bool,
    answers: HashMap<String, Vec<Exchange>>,
}

impl Session {
    /// Empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected document.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Reconcile the selection with a freshly fetched document list.
    ///
    /// The previous selection is kept if still listed; otherwise the first document is chosen.
    pub fn sync_documents(&mut self, documents: &[String]) {
        let still_listed = self
            .selected
            .as_ref()
            .is_some_and(|current| documents.contains(current));
        if !still_listed {
            self.selected = documents.first().cloned();
        }
    }

    /// Select by 1-based position or by identifier. Returns the chosen identifier.
    pub fn select(&mut self, documents: &[String], choice: &str) -> Option<&str> {
        let choice = choice.trim();
        let found = choice
            .parse::<usize>()
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| documents.get(index))
            .or_else(|| documents.iter().find(|id| id.as_str() == choice))?;
        self.selected = Some(found.clone());
        self.selected.as_deref()
    }

    /// Whether an upload may be submitted now.
    pub fn can_upload(&self) -> bool {
        !self.file_uploaded
    }

    /// Note a successful upload; further uploads are blocked until [`Session::allow_another_upload`].
    pub fn mark_uploaded(&mut self) {
        self.file_uploaded = true;
    }

    /// Re-enable uploading.
    pub fn allow_another_upload(&mut self) {
        self.file_uploaded = false;
    }

    /// Append an answered question to the log for `file_id`.
    pub fn record_answer(&mut self, file_id: &str, question: &str, answer: &str) {
        self.answers
            .entry(file_id.to_string())
            .or_default()
            .push(Exchange {
                question: question.to_string(),
                answer: answer.to_string(),
            });
    }

    /// Questions asked about `file_id`, most recent last.
    pub fn history(&self, file_id: &str) -> &[Exchange] {
        self.answers
            .get(file_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop the log for a deleted document.
    pub fn forget(&mut self, file_id: &str) {
        self.answers.remove(file_id);
        if self.selected.as_deref() == Some(file_id) {
            self.selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn selection_follows_document_list() {
        let mut session = Session::new();
        session.sync_documents(&docs(&[]));
        assert_eq!(session.selected(), None);

        session.sync_documents(&docs(&["a", "b"]));
        assert_eq!(session.selected(), Some("a"));

        session.select(&docs(&["a", "b"]), "2");
        session.sync_documents(&docs(&["a", "b", "c"]));
        assert_eq!(session.selected(), Some("b"));

        session.sync_documents(&docs(&["c"]));
        assert_eq!(session.selected(), Some("c"));
    }

    #[test]
    fn select_accepts_position_or_identifier() {
        let documents = docs(&["first", "second"]);
        let mut session = Session::new();
        assert_eq!(session.select(&documents, "second"), Some("second"));
        assert_eq!(session.select(&documents, " 1 "), Some("first"));
        assert_eq!(session.select(&documents, "0"), None);
        assert_eq!(session.select(&documents, "unknown"), None);
        assert_eq!(session.selected(), Some("first"));
    }

    #[test]
    fn upload_flag_blocks_resubmission_until_reset() {
        let mut session = Session::new();
        assert!(session.can_upload());
        session.mark_uploaded();
        assert!(!session.can_upload());
        session.allow_another_upload();
        assert!(session.can_upload());
    }

    #[test]
    fn history_is_per_document_and_ordered() {
        let mut session = Session::new();
        session.record_answer("a", "q1", "a1");
        session.record_answer("b", "other", "x");
        session.record_answer("a", "q2", "a2");

        let questions: Vec<&str> = session
            .history("a")
            .iter()
            .map(|exchange| exchange.question.as_str())
            .collect();
        assert_eq!(questions, vec!["q1", "q2"]);
        assert_eq!(session.history("b").len(), 1);
        assert!(session.history("none").is_empty());

        session.forget("a");
        assert!(session.history("a").is_empty());
    }
}
