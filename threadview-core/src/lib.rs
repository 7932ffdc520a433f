pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod render;
pub mod service;
pub mod terminal;
pub mod thread_id;

pub use client::{ApiConfig, ListQuery, OpenAiClient, Page, SortOrder, ThreadSource};
pub use config::{Overrides, Settings};
pub use error::{Result, ThreadviewError};
pub use model::{
    Assistant, ContentPart, Message, MessageRole, RunStep, RunStepList, ThreadAggregate, ToolCall,
};
pub use render::{render_text_maybe_json, render_thread_markdown};
pub use service::{FetchOptions, aggregate_to_raw_json, fetch_thread};
pub use terminal::{TerminalOptions, render_terminal, terminal_width};
pub use thread_id::ThreadId;
