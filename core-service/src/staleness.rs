//! Presentation-side guard against superseded results.
//!
//! The bridge gives no ordering guarantee, so an early search can complete
//! after a later one. Track each submission with [`LiveRequest::track`] and
//! apply a delivered result only when [`LiveRequest::is_live`] agrees.

use crate::operation::RequestId;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LiveRequest {
    latest: Option<RequestId>,
}

impl LiveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submission. Older ids never replace a newer one.
    pub fn track(&mut self, request_id: RequestId) {
        if self.latest.map_or(true, |latest| request_id > latest) {
            self.latest = Some(request_id);
        }
    }

    pub fn is_live(&self, request_id: RequestId) -> bool {
        self.latest == Some(request_id)
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Forgets the tracked request, so every late result is stale.
    pub fn clear(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut live = LiveRequest::new();
        live.track(RequestId::new(1));
        live.track(RequestId::new(2));

        assert!(!live.is_live(RequestId::new(1)));
        assert!(live.is_live(RequestId::new(2)));

        live.track(RequestId::new(1));
        assert_eq!(live.latest(), Some(RequestId::new(2)));
    }

    #[test]
    fn test_clear() {
        let mut live = LiveRequest::new();
        live.track(RequestId::new(3));
        live.clear();
        assert!(!live.is_live(RequestId::new(3)));
    }
}
