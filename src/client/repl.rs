use super::{ApiClient, Session};
use colored::Colorize;
use rustyline::{Editor, error::ReadlineError, history::DefaultHistory};
use std::path::PathBuf;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Choose a document by 1-based position or identifier.
    Select(String),
    /// Upload a local file.
    Upload(PathBuf),
    /// Allow another upload after a successful one.
    UploadAnother,
    /// Ask a question about the selected document.
    Ask(String),
    /// Show the Q&A log for the selected document.
    History,
    /// Delete the selected document.
    Delete,
    /// Print the command list.
    Help,
    /// Leave the client.
    Quit,
    /// Blank input.
    Empty,
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse a line; the first word is the command and the rest its argument.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));

        match word.to_ascii_lowercase().as_str() {
            "" => Command::Empty,
            "select" | "use" => Command::Select(rest.to_string()),
            "upload" => Command::Upload(PathBuf::from(rest)),
            "upload-another" => Command::UploadAnother,
            "ask" | "q" => Command::Ask(rest.to_string()),
            "history" => Command::History,
            "delete" => Command::Delete,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(word.to_string()),
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Interactive loop over an [`ApiClient`].
pub struct Repl {
    client: ApiClient,
    session: Session,
}

impl Repl {
    /// Create a loop with a fresh session.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            session: Session::new(),
        }
    }

    /// Run until `quit`, Ctrl-C, or Ctrl-D.
    pub fn run(&mut self) -> Result<(), ReadlineError> {
        let mut editor = Editor::<(), DefaultHistory>::new()?;
        println!("{}", "Document Q&A".blue().bold());
        println!("Connected to {}", self.client.base_url().cyan());
        print_help();

        loop {
            let documents = self.render();
            match editor.readline("docqa> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if let Flow::Quit = self.execute(Command::parse(&line), &documents) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Fetch the document list, reconcile the selection, and print both.
    fn render(&mut self) -> Vec<String> {
        let documents = match self.client.list_documents() {
            Ok(documents) => documents,
            Err(error) => {
                tracing::debug!(error = %error, "Listing documents failed");
                Vec::new()
            }
        };
        self.session.sync_documents(&documents);

        println!();
        println!("{}", "Your uploaded documents".bold());
        if documents.is_empty() {
            println!("  No documents uploaded yet.");
        }
        for (position, id) in documents.iter().enumerate() {
            let line = format!("{:>3}. {id}", position + 1);
            if self.session.selected() == Some(id.as_str()) {
                println!("{} {}", "*".green(), line.green().bold());
            } else {
                println!("  {line}");
            }
        }
        documents
    }

    fn execute(&mut self, command: Command, documents: &[String]) -> Flow {
        match command {
            Command::Empty => {}
            Command::Help => print_help(),
            Command::Quit => return Flow::Quit,
            Command::Unknown(word) => {
                warn(&format!("Unknown command '{word}'. Type 'help' for the list."));
            }
            Command::Select(choice) => match self.session.select(documents, &choice) {
                Some(id) => println!("Selected {}", id.cyan()),
                None => warn(&format!("No document matches '{choice}'.")),
            },
            Command::Upload(path) => self.upload(path),
            Command::UploadAnother => {
                self.session.allow_another_upload();
                println!("Ready for another upload.");
            }
            Command::Ask(question) => self.ask(&question),
            Command::History => self.history(),
            Command::Delete => self.delete(),
        }
        Flow::Continue
    }

    fn upload(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() {
            warn("Usage: upload <path-to-pdf>");
            return;
        }
        if !self.session.can_upload() {
            warn("A file was already uploaded. Run 'upload-another' to upload a new one.");
            return;
        }
        match self.client.upload(&path) {
            Ok(file_id) => {
                self.session.mark_uploaded();
                println!(
                    "{} File uploaded successfully! File ID: {}",
                    "✔".green(),
                    file_id.bold()
                );
            }
            Err(error) => fail("Upload failed.", &error),
        }
    }

    fn ask(&mut self, question: &str) {
        let Some(file_id) = self.session.selected().map(str::to_string) else {
            warn("Please select a document.");
            return;
        };
        if question.is_empty() {
            warn("Please enter a question.");
            return;
        }
        match self.client.query(&file_id, question) {
            Ok(answer) => {
                self.session.record_answer(&file_id, question, &answer);
                let turn = self.session.history(&file_id).len();
                println!("{} {answer}", format!("A{turn}:").green().bold());
            }
            Err(error) => fail("Query failed.", &error),
        }
    }

    fn history(&self) {
        let Some(file_id) = self.session.selected() else {
            warn("Please select a document.");
            return;
        };
        let exchanges = self.session.history(file_id);
        if exchanges.is_empty() {
            println!("No questions asked about {file_id} yet.");
            return;
        }
        println!("{}", "Previous Q&A".bold());
        for (turn, exchange) in exchanges.iter().enumerate() {
            println!("{} {}", format!("Q{}:", turn + 1).bold(), exchange.question);
            println!("{} {}", format!("A{}:", turn + 1).green(), exchange.answer);
        }
    }

    fn delete(&mut self) {
        let Some(file_id) = self.session.selected().map(str::to_string) else {
            warn("No document selected for deletion.");
            return;
        };
        match self.client.delete(&file_id) {
            Ok(()) => {
                self.session.forget(&file_id);
                println!("{} File deleted successfully: {file_id}", "✔".green());
            }
            Err(error) => fail("Deletion failed.", &error),
        }
    }
}

fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  select <n|id>     choose a document");
    println!("  upload <path>     upload a PDF");
    println!("  upload-another    allow another upload");
    println!("  ask <question>    ask about the selected document");
    println!("  history           show previous answers for the selected document");
    println!("  delete            delete the selected document");
    println!("  help              show this list");
    println!("  quit              exit");
}

fn warn(message: &str) {
    println!("{} {message}", "⚠".yellow());
}

fn fail(message: &str, error: &super::ClientError) {
    tracing::debug!(error = %error, "{message}");
    println!("{} {message}", "✘".red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn repl_for(server: &MockServer) -> Repl {
        Repl::new(ApiClient::new(server.base_url()))
    }

    fn documents(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn selected_repl(server: &MockServer, listed: &[String]) -> Repl {
        let mut repl = repl_for(server);
        repl.execute(Command::Select("1".into()), listed);
        assert_eq!(repl.session.selected(), Some("doc-1"));
        repl
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("ask  What is the total?  "),
            Command::Ask("What is the total?".into())
        );
        assert_eq!(
            Command::parse("upload ./docs/report.pdf"),
            Command::Upload(PathBuf::from("./docs/report.pdf"))
        );
        assert_eq!(Command::parse("select 2"), Command::Select("2".into()));
        assert_eq!(Command::parse("ask"), Command::Ask(String::new()));
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("HELP"), Command::Help);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("upload-another"), Command::UploadAnother);
        assert_eq!(Command::parse("history"), Command::History);
        assert_eq!(Command::parse("delete"), Command::Delete);
        assert_eq!(Command::parse("frobnicate x"), Command::Unknown("frobnicate".into()));
    }

    #[test]
    fn second_upload_waits_for_upload_another() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/upload/");
            then.status(200)
                .json_body(serde_json::json!({ "file_id": "doc-1" }));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4 notes").unwrap();

        let mut repl = repl_for(&server);
        repl.execute(Command::Upload(path.clone()), &[]);
        assert_eq!(mock.hits(), 1);
        assert!(!repl.session.can_upload());

        repl.execute(Command::Upload(path.clone()), &[]);
        assert_eq!(mock.hits(), 1);

        repl.execute(Command::UploadAnother, &[]);
        repl.execute(Command::Upload(path), &[]);
        mock.assert_hits(2);
    }

    #[test]
    fn failed_upload_keeps_uploading_enabled() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/upload/");
            then.status(400)
                .json_body(serde_json::json!({ "detail": "Only PDF files are allowed." }));
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"%PDF-1.4 notes").unwrap();

        let mut repl = repl_for(&server);
        repl.execute(Command::Upload(path), &[]);
        mock.assert();
        assert!(repl.session.can_upload());
    }

    #[test]
    fn answered_question_is_appended_to_history() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/query/")
                .query_param("file_id", "doc-1")
                .query_param("question", "Who signed it?");
            then.status(200)
                .json_body(serde_json::json!({ "question": "Who signed it?", "answer": "Ada" }));
        });
        let listed = documents(&["doc-1", "doc-2"]);
        let mut repl = selected_repl(&server, &listed);

        repl.execute(Command::Ask("Who signed it?".into()), &listed);
        repl.execute(Command::Ask("Who signed it?".into()), &listed);

        mock.assert_hits(2);
        let history = repl.session.history("doc-1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "Who signed it?");
        assert_eq!(history[1].answer, "Ada");
        assert!(repl.session.history("doc-2").is_empty());
    }

    #[test]
    fn failed_query_leaves_history_unchanged() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/query/");
            then.status(500)
                .json_body(serde_json::json!({ "detail": "Error processing query" }));
        });
        let listed = documents(&["doc-1"]);
        let mut repl = selected_repl(&server, &listed);

        repl.execute(Command::Ask("Anything?".into()), &listed);

        mock.assert();
        assert!(repl.session.history("doc-1").is_empty());
    }

    #[test]
    fn blank_question_is_not_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/query/");
            then.status(200).json_body(serde_json::json!({ "answer": "unused" }));
        });
        let listed = documents(&["doc-1"]);
        let mut repl = selected_repl(&server, &listed);

        repl.execute(Command::Ask(String::new()), &listed);
        let mut unselected = repl_for(&server);
        unselected.execute(Command::Ask("Anything?".into()), &listed);

        assert_eq!(mock.hits(), 0);
    }

    #[test]
    fn delete_forgets_selection_and_history() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/query/");
            then.status(200).json_body(serde_json::json!({ "answer": "Ada" }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/delete/doc-1");
            then.status(200)
                .json_body(serde_json::json!({ "message": "File deleted successfully" }));
        });
        let listed = documents(&["doc-1"]);
        let mut repl = selected_repl(&server, &listed);
        repl.execute(Command::Ask("Who signed it?".into()), &listed);
        assert_eq!(repl.session.history("doc-1").len(), 1);

        repl.execute(Command::Delete, &listed);

        delete.assert();
        assert_eq!(repl.session.selected(), None);
        assert!(repl.session.history("doc-1").is_empty());
    }

    #[test]
    fn failed_delete_keeps_history() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/query/");
            then.status(200).json_body(serde_json::json!({ "answer": "Ada" }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/delete/doc-1");
            then.status(404)
                .json_body(serde_json::json!({ "detail": "File not found" }));
        });
        let listed = documents(&["doc-1"]);
        let mut repl = selected_repl(&server, &listed);
        repl.execute(Command::Ask("Who signed it?".into()), &listed);

        repl.execute(Command::Delete, &listed);

        delete.assert();
        assert_eq!(repl.session.selected(), Some("doc-1"));
        assert_eq!(repl.session.history("doc-1").len(), 1);
    }

    #[test]
    fn quit_ends_the_loop() {
        let server = MockServer::start();
        let mut repl = repl_for(&server);
        assert!(matches!(repl.execute(Command::Quit, &[]), Flow::Quit));
        assert!(matches!(repl.execute(Command::Help, &[]), Flow::Continue));
    }
}
