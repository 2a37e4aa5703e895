pub mod dispatcher;
pub mod executor;
pub mod interpreter;
pub mod providers;
pub mod registry;
pub mod slides;

pub use dispatcher::{
    BackendFailure, DispatchResult, DispatchSettings, FallbackDispatcher, NO_CREDENTIALS,
};
pub use executor::ToolExecutor;
pub use interpreter::{
    InterpretedReply, JsonShape, ToolDirective, VideoSearchPayload, extract_json, interpret,
};
pub use providers::{
    AnthropicProvider, ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse,
    OpenAiCompatProvider, Usage,
};
pub use registry::{AvailableBackend, ProviderDescriptor, ProviderKind, ProviderRegistry};
pub use slides::{generate_slides, generation_failed_deck};
