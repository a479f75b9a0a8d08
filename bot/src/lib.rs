pub mod callback;
pub mod commands;
pub mod inbound;
pub mod router;
pub mod state;
pub mod telegram;

pub use inbound::{Inbound, InboundKind};
pub use router::Router;
pub use state::{AppState, SharedState};
pub use telegram::TeloxideClient;
