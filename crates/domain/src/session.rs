use serde::{Deserialize, Serialize};

/// Lifecycle state of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No vendor handle is held
    Closed,
    /// Vendor connect succeeded and the post-connect steps completed
    Open,
}

impl SessionState {
    /// Check if device operations are allowed
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Transition to open state
    pub fn to_open(&self) -> Result<Self, &'static str> {
        match self {
            Self::Closed => Ok(Self::Open),
            Self::Open => Err("session is already open"),
        }
    }

    /// Transition to closed state, reachable from any state
    pub fn to_closed(&self) -> Self {
        Self::Closed
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_closed() {
        let state = SessionState::default();
        assert_eq!(state, SessionState::Closed);
        assert!(!state.is_open());
    }

    #[test]
    fn test_transition_closed_to_open() {
        let next = SessionState::Closed.to_open().unwrap();
        assert_eq!(next, SessionState::Open);
        assert!(next.is_open());
    }

    #[test]
    fn test_cannot_open_twice() {
        assert!(SessionState::Open.to_open().is_err());
    }

    #[test]
    fn test_to_closed_from_any_state() {
        assert_eq!(SessionState::Open.to_closed(), SessionState::Closed);
        assert_eq!(SessionState::Closed.to_closed(), SessionState::Closed);
    }
}
