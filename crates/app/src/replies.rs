//! Pending replies for blocking request/response exchanges with the viewhost.
//!
//! A waiter is keyed by the `seqno` stamped on the outbound request. The IO
//! thread completes it when a message carrying the same `seqno` arrives.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

/// Field carrying the sequence number on requests and replies.
pub const SEQNO_FIELD: &str = "seqno";

/// Registry of outstanding waiters.
#[derive(Debug)]
pub struct PendingReplies {
    next_seqno: AtomicU64,
    waiters: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
}

impl Default for PendingReplies {
    fn default() -> Self {
        Self {
            next_seqno: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }
}

impl PendingReplies {
    /// Allocate a sequence number and the receiver its reply will arrive on.
    pub fn register(&self) -> (u64, oneshot::Receiver<Value>) {
        let seqno = self.next_seqno.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        self.lock().insert(seqno, sender);
        (seqno, receiver)
    }

    /// Deliver `reply` to the waiter for `seqno`.
    ///
    /// Returns false when nobody waits for it (never registered, already
    /// answered, or timed out).
    pub fn complete(&self, seqno: u64, reply: Value) -> bool {
        let Some(sender) = self.lock().remove(&seqno) else {
            return false;
        };
        // A receiver dropped between removal and send still counts as
        // consumed: the reply belonged to this exchange.
        let _ = sender.send(reply);
        true
    }

    /// Forget the waiter for `seqno`.
    pub fn cancel(&self, seqno: u64) {
        self.lock().remove(&seqno);
    }

    /// Guard that forgets the waiter for `seqno` when dropped, including when
    /// the awaiting future is dropped before its reply arrives.
    pub fn cancel_on_drop(&self, seqno: u64) -> CancelOnDrop<'_> {
        CancelOnDrop {
            replies: self,
            seqno,
        }
    }

    /// Number of outstanding waiters.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Value>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop guard returned by [`PendingReplies::cancel_on_drop`].
#[derive(Debug)]
pub struct CancelOnDrop<'a> {
    replies: &'a PendingReplies,
    seqno: u64,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.replies.cancel(self.seqno);
    }
}

/// Sequence number carried by `message`, if any.
pub fn seqno_of(message: &Value) -> Option<u64> {
    message.get(SEQNO_FIELD).and_then(Value::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reply_reaches_its_waiter() -> Result<(), Box<dyn std::error::Error>> {
        let replies = PendingReplies::default();
        let (first, _first_rx) = replies.register();
        let (second, second_rx) = replies.register();
        assert_ne!(first, second);

        assert!(replies.complete(second, json!({ "seqno": second, "ok": true })));
        assert_eq!(second_rx.await?["ok"], json!(true));
        assert!(!replies.complete(second, json!({})));
        assert_eq!(replies.len(), 1);
        Ok(())
    }

    #[test]
    fn cancelled_waiters_ignore_replies() {
        let replies = PendingReplies::default();
        let (seqno, receiver) = replies.register();
        replies.cancel(seqno);
        drop(receiver);
        assert!(!replies.complete(seqno, json!({})));
        assert!(replies.is_empty());
    }

    #[test]
    fn guard_cancels_on_drop() {
        let replies = PendingReplies::default();
        let (seqno, _receiver) = replies.register();
        {
            let _guard = replies.cancel_on_drop(seqno);
            assert_eq!(replies.len(), 1);
        }
        assert!(replies.is_empty());
        assert!(!replies.complete(seqno, json!({})));
    }

    #[test]
    fn seqno_is_read_from_unsigned_field() {
        assert_eq!(seqno_of(&json!({ "seqno": 7 })), Some(7));
        assert_eq!(seqno_of(&json!({ "seqno": "7" })), None);
        assert_eq!(seqno_of(&json!([])), None);
    }
}
