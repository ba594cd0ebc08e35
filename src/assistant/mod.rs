//! The data assistant: prompt assembly, session log and the chat pipeline.

pub mod context;
pub mod conversation;
pub mod pipeline;

pub use context::{compose_system_prompt, greeting, Persona};
pub use conversation::ConversationState;
pub use pipeline::{PipelineConfig, ResponsePipeline};
