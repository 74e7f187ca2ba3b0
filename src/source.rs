//! Source domain: named, priority-ranked loaders and the registry that resolves them.

pub mod descriptor;
pub mod registry;

pub use descriptor::{DataSourceDescriptor, DataSourceLoader, FnLoader};
pub use registry::DataSourceRegistry;

/// Well-known source names used by the default configuration.
pub mod names {
    pub const PROFILE: &str = "profile";
    pub const TASKS: &str = "tasks";
    pub const GOALS: &str = "goals";
    pub const SESSIONS: &str = "sessions";
    pub const REWARDS: &str = "rewards";
    pub const PREFERENCES: &str = "preferences";
    pub const CONVERSATION: &str = "conversation";
}
