// Public modules
pub mod chat;
pub mod client;
pub mod conversation;
pub mod error;
pub mod events;
pub mod model;
pub mod observability;
pub mod protocol;
pub mod proxy;
pub mod session_logger;

// Re-exports
pub use chat::{ChatSession, ContinuousChat, SessionConfig, SessionStats};
pub use client::{ChunkStream, ProxyClient};
pub use conversation::{Conversation, Message, Role};
pub use error::{Error, Result};
pub use events::{CallbackRegistry, EventKind, HandlerError};
pub use model::{KnownModel, ModelSelection};
pub use protocol::{ChatRequest, ChatResponse, GenerateRecord, GenerateRequest};
pub use proxy::ProxyConfig;
pub use session_logger::{NullSessionLogger, SessionLogger};
