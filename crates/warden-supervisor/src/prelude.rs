//! Convenience re-exports for consumers of `warden-supervisor`.

pub use crate::config::SupervisorConfig;
pub use crate::error::{SupervisorError, SupervisorResult};
pub use crate::provider::{
    CommandHandle, CommandOptions, NetworkPolicy, ProviderError, ProviderResult, PtyHandle, PtySizeSpec, Sandbox,
    SandboxProvider,
};
pub use crate::remote_session::RemoteAgentSession;
pub use crate::supervisor::{SupervisedSession, Supervisor};
