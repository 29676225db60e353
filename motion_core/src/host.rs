// Host scheduling seam: frame requests and resize listeners.
// The host (browser rAF on the JS side, or a test harness) fires frames; we only
// book-keep which requests and listeners are live.

use std::collections::BTreeSet;

/// Token for one pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameRequest(u64);

/// Token for a resize listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Frame scheduling and viewport notifications provided by the host.
pub trait FrameHost {
    /// Ask for one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;

    fn cancel_frame(&mut self, request: FrameRequest);

    /// Consume a request when its frame fires. Returns false for cancelled
    /// or already-fired requests.
    fn fire_frame(&mut self, request: FrameRequest) -> bool;

    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, id: ListenerId);
}

/// Book-keeping FrameHost. The JS side polls `has_pending` to decide whether to
/// call `requestAnimationFrame`.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next: u64,
    pending: BTreeSet<FrameRequest>,
    listeners: BTreeSet<ListenerId>,
}

impl FrameQueue {
    pub fn new() -> Self {
        FrameQueue::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn bump(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

impl FrameHost for FrameQueue {
    fn request_frame(&mut self) -> FrameRequest {
        let req = FrameRequest(self.bump());
        self.pending.insert(req);
        req
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.remove(&request);
    }

    fn fire_frame(&mut self, request: FrameRequest) -> bool {
        self.pending.remove(&request)
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.bump());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fired_request_cannot_fire_twice() {
        let mut queue = FrameQueue::new();
        let req = queue.request_frame();
        assert!(queue.fire_frame(req));
        assert!(!queue.fire_frame(req));
        assert!(!queue.has_pending());
    }

    #[test]
    fn cancelled_request_never_fires() {
        let mut queue = FrameQueue::new();
        let req = queue.request_frame();
        queue.cancel_frame(req);
        assert!(!queue.fire_frame(req));
    }

    #[test]
    fn listeners_are_counted() {
        let mut queue = FrameQueue::new();
        let a = queue.add_resize_listener();
        let b = queue.add_resize_listener();
        assert_eq!(queue.listener_count(), 2);
        queue.remove_resize_listener(a);
        queue.remove_resize_listener(b);
        assert_eq!(queue.listener_count(), 0);
    }
}
