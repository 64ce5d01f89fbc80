pub mod config;
pub mod error;
pub mod gateway;
pub mod traits;
pub mod types;

pub use config::{ClientFactory, GatewayConfig};
pub use error::{GatewayError, Result};
pub use gateway::GatewayClient;
pub use traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
pub use types::{FunctionCall, FunctionDefinition, Message, Tool, ToolCall, ToolChoice};
