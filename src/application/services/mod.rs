mod chat;
mod corpus;
mod rag;

pub use chat::{ChatEngine, ChatSession, ChatSettings, SessionState};
pub use corpus::{CorpusLoader, ParserRegistry};
pub use rag::{IndexSettings, RagService};
