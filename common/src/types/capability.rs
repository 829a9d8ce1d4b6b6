/// A gated platform capability.
///
/// The granted/denied state is owned by the platform permission subsystem and
/// only observed here; it is re-evaluated on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    Location,
    Notifications,
}

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied(DenialReason),
}

/// Why a permission request resolved denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The user declined the prompt.
    Declined,
    /// The platform could not present a prompt (e.g. no foreground context).
    PromptUnavailable,
    /// The pending prompt was dropped by the platform before resolving.
    Superseded,
}

impl PermissionDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionDecision::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_granted() {
        assert!(PermissionDecision::Granted.is_granted());
        assert!(!PermissionDecision::Denied(DenialReason::Declined).is_granted());
        assert!(!PermissionDecision::Denied(DenialReason::PromptUnavailable).is_granted());
    }
}
