pub mod completion;
pub mod db;
pub mod translate;

pub use completion::{CompletionConfig, PerplexityAdapter};
pub use db::DbAdapter;
pub use translate::MyMemoryTranslator;
