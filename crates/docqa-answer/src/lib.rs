//! Query orchestration: search, prompt assembly, generation, tolerant output
//! parsing, confidence scoring and query history.
pub mod confidence;
pub mod history;
pub mod openai;
pub mod orchestrator;
pub mod parse;
pub mod prompt;

pub use history::InMemoryHistory;
pub use openai::OpenAiAnswerer;
pub use orchestrator::QueryOrchestrator;
pub use parse::StructuredAnswer;
