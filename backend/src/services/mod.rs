pub mod agent;
pub mod chat_history;
pub mod device_tokens;
pub mod session_bridge;

pub use agent::{AgentClient, AgentEvent, AgentQuery, FrameDecoder};
pub use chat_history::ChatHistoryService;
pub use device_tokens::{AuthorizationStart, DeviceLockRegistry, DeviceTokenService};
pub use session_bridge::{RestoredLink, SessionBridge};
