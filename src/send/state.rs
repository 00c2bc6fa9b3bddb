//! Response lifecycle

/// Where a response is in the pipeline
///
/// States only move forward. `Streaming` is the point of no return: headers are
/// final and a failure can only end the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponseState {
    Unresolved,
    ConditionalChecked,
    RangeSelected,
    Streaming,
    Completed,
    Failed,
}

impl ResponseState {
    /// Move to `next`; backwards moves and moves out of a terminal state are refused
    pub fn advance(&mut self, next: Self) -> bool {
        if self.is_terminal() || next <= *self {
            return false;
        }
        *self = next;
        true
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        let mut state = ResponseState::Unresolved;
        assert!(state.advance(ResponseState::ConditionalChecked));
        assert!(state.advance(ResponseState::RangeSelected));
        assert!(!state.advance(ResponseState::ConditionalChecked));
        assert!(state.advance(ResponseState::Streaming));
        assert!(state.advance(ResponseState::Completed));
        assert!(!state.advance(ResponseState::Failed));
        assert_eq!(state, ResponseState::Completed);
    }

    #[test]
    fn test_failure_from_streaming() {
        let mut state = ResponseState::Streaming;
        assert!(state.advance(ResponseState::Failed));
        assert!(state.is_terminal());
    }
}
