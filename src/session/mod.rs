pub mod context;
pub mod gate;

pub use context::{SessionContext, SessionStore};
pub use gate::{GateState, LoginRedirect, MountedGate, SessionGate, SessionVerifier};
