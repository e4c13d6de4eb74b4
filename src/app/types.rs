/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why `run` is returning
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Signal(String),
    /// Requested through a [`super::ShutdownTrigger`]
    UserRequest,
}
