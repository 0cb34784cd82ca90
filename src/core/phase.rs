use std::fmt;

/// Lifecycle phase of one supervised invocation.
///
/// ```text
/// Idle ──► SettingUp ──► Running ──► ShuttingDown ──► Terminated
///              │            │              │
///              └────────────┴──────────────┴──► ErrorExit
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SettingUp,
    Running,
    ShuttingDown,
    Terminated,
    ErrorExit,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::SettingUp => "setting_up",
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting_down",
            Phase::Terminated => "terminated",
            Phase::ErrorExit => "error_exit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
