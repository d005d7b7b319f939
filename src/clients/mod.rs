pub mod gemini_client;
pub mod llm_client;
pub mod sheet_client;

pub use gemini_client::GeminiClient;
pub use llm_client::LlmClient;
pub use sheet_client::SheetClient;
