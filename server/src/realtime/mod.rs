pub mod engine;
pub mod registry;
pub mod websocket;

pub use engine::{BroadcastEngine, ClientEvent, ServerEvent, HISTORY_LIMIT};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use websocket::chat_socket;
