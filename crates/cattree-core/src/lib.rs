pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod tabular;
pub mod validation;

pub use chat::{ChatDispatcher, ChatId, Reply, Transport};
pub use config::{Config, RemovalPolicy};
pub use engine::{
    Added, CategoryPath, HierarchyEngine, Removed, ResultMessage, TreeNode, SAMPLE_PATHS,
};
pub use error::{CatTreeError, Result};
pub use store::{
    Category, CategoryForest, CategoryId, CategoryStore, FileStore, NewCategory,
    DEFAULT_STORE_FILE,
};
pub use tabular::{decode_rows, encode_rows, ImportReport, Row};
pub use validation::{is_valid, normalize, NameRules, MAX_NAME_LENGTH};
