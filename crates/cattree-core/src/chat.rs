//! Chat command dispatch
//!
//! Maps slash commands (`/addElement books/fiction`, `/viewTree`, ...) onto
//! the engine and the tabular codec. Replies are plain values; sending them
//! is left to a [`Transport`] supplied by the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::engine::{HierarchyEngine, ResultMessage};
use crate::error::Result;
use crate::store::CategoryStore;
use crate::tabular;

pub type ChatId = i64;

pub const WELCOME: &str = "Welcome! Type /help to see the list of commands.";

pub const HELP: &str = "\
/viewTree - show the category tree
/addElement <parent>/<child> - add a category (any depth, e.g. books/fiction/classics)
/removeElement <parent>/<child> - remove a category
/download - download the category tree as a CSV file
/upload - upload a category tree from a CSV file";

pub const EMPTY_TREE: &str = "No categories yet.";

/// Outgoing chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    File(PathBuf),
}

impl From<ResultMessage> for Reply {
    fn from(message: ResultMessage) -> Self {
        Reply::Text(message.to_string())
    }
}

/// Delivery side of a chat integration
pub trait Transport {
    fn send_text(&mut self, chat: ChatId, text: &str) -> Result<()>;

    fn send_file(&mut self, chat: ChatId, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    ViewTree,
    AddElement,
    RemoveElement,
    Download,
    Upload,
}

impl Command {
    /// `/viewTree`, `/viewtree` and `/viewTree@some_bot` all match
    fn parse(token: &str) -> Option<Self> {
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "viewtree" => Some(Self::ViewTree),
            "addelement" => Some(Self::AddElement),
            "removeelement" => Some(Self::RemoveElement),
            "download" => Some(Self::Download),
            "upload" => Some(Self::Upload),
            _ => None,
        }
    }
}

/// Routes chat text to the engine and tracks which chats are uploading
#[derive(Debug)]
pub struct ChatDispatcher<S> {
    engine: HierarchyEngine<S>,
    export_path: PathBuf,
    header: bool,
    uploading: HashSet<ChatId>,
}

impl<S: CategoryStore> ChatDispatcher<S> {
    pub fn new(engine: HierarchyEngine<S>, export_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            export_path: export_path.into(),
            header: true,
            uploading: HashSet::new(),
        }
    }

    pub fn from_config(engine: HierarchyEngine<S>, base_dir: &Path, config: &Config) -> Self {
        Self::new(engine, config.export_path(base_dir)).with_header(config.tabular.header)
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn engine(&self) -> &HierarchyEngine<S> {
        &self.engine
    }

    pub fn is_uploading(&self, chat: ChatId) -> bool {
        self.uploading.contains(&chat)
    }

    /// True when `text` starts with a known slash command
    ///
    /// `/tmp/tree.csv` is not a command, so callers in upload mode can treat
    /// it as a file path.
    pub fn is_command(&self, text: &str) -> bool {
        Command::parse(split_command(text).0).is_some()
    }

    /// Handle one text message
    pub fn handle_text(&mut self, chat: ChatId, text: &str) -> Reply {
        let (token, args) = split_command(text);

        let Some(command) = Command::parse(token) else {
            tracing::debug!(chat, text, "unrecognized message");
            return Reply::Text("Unknown command. Type /help to see the list of commands.".to_string());
        };

        tracing::debug!(chat, ?command, "dispatching command");
        match command {
            Command::Start => Reply::Text(WELCOME.to_string()),
            Command::Help => Reply::Text(HELP.to_string()),
            Command::ViewTree => self.view_tree(),
            Command::AddElement => {
                if args.is_empty() {
                    return Reply::Text(
                        "Invalid command format. Use:\n/addElement <parent>/<child>".to_string(),
                    );
                }
                ResultMessage::from_result(self.engine.add_category(args, None)).into()
            }
            Command::RemoveElement => {
                if args.is_empty() {
                    return Reply::Text(
                        "Error: no category given. Use:\n/removeElement <category path>".to_string(),
                    );
                }
                ResultMessage::from_result(self.engine.remove_category(args)).into()
            }
            Command::Download => self.download(),
            Command::Upload => {
                self.uploading.insert(chat);
                Reply::Text("Now send a CSV file with the category tree.".to_string())
            }
        }
    }

    /// Handle an uploaded file; only accepted after `/upload`
    pub fn handle_document(&mut self, chat: ChatId, path: &Path) -> Reply {
        if !self.uploading.remove(&chat) {
            return Reply::Text("Send /upload first, then the file.".to_string());
        }

        let result = tabular::import_csv(&mut self.engine, path, self.header);
        match result {
            Ok(report) => {
                let mut text = format!("File processed. {}", report);
                for failure in report.failures.iter().take(10) {
                    text.push_str(&format!("\nRow {}: {}", failure.row, failure.error));
                }
                Reply::Text(text)
            }
            Err(e) => ResultMessage::from_result::<String>(Err(e)).into(),
        }
    }

    /// Send a reply through `transport`
    pub fn deliver<T: Transport>(&self, transport: &mut T, chat: ChatId, reply: &Reply) -> Result<()> {
        match reply {
            Reply::Text(text) => transport.send_text(chat, text),
            Reply::File(path) => transport.send_file(chat, path),
        }
    }

    fn view_tree(&self) -> Reply {
        match self.engine.is_empty() {
            Ok(true) => Reply::Text(EMPTY_TREE.to_string()),
            Ok(false) => match self.engine.render_tree() {
                Ok(tree) => Reply::Text(tree),
                Err(e) => ResultMessage::from_result::<String>(Err(e)).into(),
            },
            Err(e) => ResultMessage::from_result::<String>(Err(e)).into(),
        }
    }

    fn download(&self) -> Reply {
        match tabular::export_csv(self.engine.store(), &self.export_path, self.header) {
            Ok(_) => Reply::File(self.export_path.clone()),
            Err(e) => ResultMessage::from_result::<String>(Err(e)).into(),
        }
    }
}

fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args.trim()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CategoryForest;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(ChatId, Reply)>,
    }

    impl Transport for RecordingTransport {
        fn send_text(&mut self, chat: ChatId, text: &str) -> Result<()> {
            self.sent.push((chat, Reply::Text(text.to_string())));
            Ok(())
        }

        fn send_file(&mut self, chat: ChatId, path: &Path) -> Result<()> {
            self.sent.push((chat, Reply::File(path.to_path_buf())));
            Ok(())
        }
    }

    fn dispatcher(dir: &TempDir) -> ChatDispatcher<CategoryForest> {
        let engine = HierarchyEngine::new(CategoryForest::new());
        ChatDispatcher::new(engine, dir.path().join("export.csv"))
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::File(path) => panic!("expected text, got file {}", path.display()),
        }
    }

    #[test]
    fn start_help_and_unknown() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);
        assert_eq!(text(d.handle_text(1, "/start")), WELCOME);
        assert_eq!(text(d.handle_text(1, "/help@cattree_bot")), HELP);
        assert!(text(d.handle_text(1, "hello")).starts_with("Unknown command"));
        assert!(text(d.handle_text(1, "/frobnicate")).starts_with("Unknown command"));
    }

    #[test]
    fn add_view_remove_flow() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);

        assert_eq!(text(d.handle_text(1, "/viewTree")), EMPTY_TREE);

        let reply = text(d.handle_text(1, "/addElement Books/Fiction"));
        assert!(reply.starts_with("Category 'books/fiction' added"));

        assert_eq!(text(d.handle_text(1, "/viewtree")), "- books\n  - fiction\n");

        let reply = text(d.handle_text(1, "/removeElement Books"));
        assert!(reply.starts_with("Error:"), "{}", reply);

        let reply = text(d.handle_text(1, "/removeElement Books/Fiction"));
        assert_eq!(reply, "Category 'Books/Fiction' removed.");
    }

    #[test]
    fn missing_arguments_show_usage() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);
        assert!(text(d.handle_text(1, "/addElement")).contains("/addElement <parent>/<child>"));
        assert!(text(d.handle_text(1, "/removeElement   ")).contains("/removeElement"));
    }

    #[test]
    fn invalid_name_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);
        let reply = text(d.handle_text(1, "/addElement bad;name"));
        assert!(reply.starts_with("Error: Invalid category name"));
        assert!(d.engine().is_empty().unwrap());
        assert!(text(d.handle_text(1, "/addElement fine")).contains("added"));
    }

    #[test]
    fn download_then_upload_into_fresh_dispatcher() {
        let dir = TempDir::new().unwrap();
        let mut source = dispatcher(&dir);
        source.handle_text(7, "/addElement A/B/C");
        source.handle_text(7, "/addElement A/D");

        let reply = source.handle_text(7, "/download");
        let Reply::File(path) = reply else {
            panic!("expected a file reply");
        };
        assert!(path.exists());

        let other = TempDir::new().unwrap();
        let mut target = dispatcher(&other);

        // not in upload mode yet
        assert!(text(target.handle_document(7, &path)).starts_with("Send /upload first"));

        target.handle_text(7, "/upload");
        assert!(target.is_uploading(7));
        assert!(!target.is_uploading(8));

        let reply = text(target.handle_document(7, &path));
        assert!(reply.starts_with("File processed."), "{}", reply);
        assert!(!target.is_uploading(7));
        assert_eq!(
            target.engine().render_tree().unwrap(),
            source.engine().render_tree().unwrap()
        );
    }

    #[test]
    fn absolute_paths_are_not_commands() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir);
        assert!(d.is_command("/viewTree"));
        assert!(d.is_command("  /addElement books/fiction"));
        assert!(d.is_command("/Upload@cattree_bot"));
        assert!(!d.is_command("/tmp/tree.csv"));
        assert!(!d.is_command("/frobnicate"));
        assert!(!d.is_command("tree.csv"));
    }

    #[test]
    fn upload_failure_clears_mode() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);
        d.handle_text(3, "/upload");
        let reply = text(d.handle_document(3, &dir.path().join("missing.csv")));
        assert!(reply.starts_with("Internal error:"));
        assert!(!d.is_uploading(3));
    }

    #[test]
    fn deliver_uses_injected_transport() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(&dir);
        let mut transport = RecordingTransport::default();

        let reply = d.handle_text(5, "/start");
        d.deliver(&mut transport, 5, &reply).unwrap();
        let reply = d.handle_text(5, "/download");
        d.deliver(&mut transport, 5, &reply).unwrap();

        assert_eq!(transport.sent.len(), 2);
        assert_eq!(transport.sent[0], (5, Reply::Text(WELCOME.to_string())));
        assert!(matches!(transport.sent[1], (5, Reply::File(_))));
    }
}
