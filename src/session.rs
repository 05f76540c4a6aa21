//! Session tokens. Beginning a session invalidates every earlier token, so an
//! old poll loop notices it has been replaced and stops.
//!
//! The registry also owns the lock that orders renders: a session's first
//! render happens under the same lock as its `begin`, and its last render
//! under the same lock as its final currency check. A superseded session
//! therefore can never draw over a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Registry {
    current: AtomicU64,
    render: Mutex<()>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.render.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Default, Clone)]
pub struct Sessions {
    registry: Arc<Registry>,
}

impl Sessions {
    pub fn new() -> Sessions {
        Sessions::default()
    }

    /// Starts a new session and returns its token.
    pub fn begin(&self) -> SessionToken {
        self.begin_with(|_| ())
    }

    /// Starts a new session and runs `first` before any other session can
    /// begin or finish.
    pub fn begin_with<F>(&self, first: F) -> SessionToken
    where
        F: FnOnce(&SessionToken),
    {
        let _guard = self.registry.lock();
        let id = self.registry.current.fetch_add(1, Ordering::SeqCst) + 1;
        let token = SessionToken {
            id,
            registry: Arc::clone(&self.registry),
        };
        first(&token);
        token
    }

    pub fn current_id(&self) -> u64 {
        self.registry.current.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    id: u64,
    registry: Arc<Registry>,
}

impl SessionToken {
    /// A token that no other session can invalidate.
    pub fn detached() -> SessionToken {
        Sessions::new().begin()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.registry.current.load(Ordering::SeqCst) == self.id
    }

    /// Runs `last` only if this session is still the newest. No session can
    /// begin while `last` runs.
    pub fn if_current<T, F>(&self, last: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        let _guard = self.registry.lock();
        if self.is_current() {
            Some(last())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn newer_session_invalidates_older() {
        let sessions = Sessions::new();
        let first = sessions.begin();
        assert!(first.is_current());

        let second = sessions.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(sessions.current_id(), second.id());
    }

    #[test]
    fn clones_share_the_registry() {
        let sessions = Sessions::new();
        let token = sessions.begin();
        sessions.clone().begin();
        assert!(!token.is_current());
    }

    #[test]
    fn detached_token_stays_current() {
        let token = SessionToken::detached();
        assert!(token.is_current());
    }

    #[test]
    fn begin_with_runs_under_the_new_token() {
        let sessions = Sessions::new();
        let old = sessions.begin();
        let mut seen = None;

        let token = sessions.begin_with(|token| seen = Some((token.id(), old.is_current())));

        assert_eq!(seen, Some((token.id(), false)));
    }

    #[test]
    fn stale_token_skips_its_last_step() {
        let sessions = Sessions::new();
        let old = sessions.begin();
        sessions.begin();

        assert_eq!(old.if_current(|| "rendered"), None);
    }

    #[test]
    fn begin_waits_for_a_running_last_step() {
        let sessions = Sessions::new();
        let token = sessions.begin();
        let before = sessions.current_id();

        let rendered = token.if_current(|| {
            let newer = sessions.clone();
            let handle = thread::spawn(move || newer.begin().id());
            thread::sleep(Duration::from_millis(50));
            // the newer session is still blocked on the render lock
            assert_eq!(sessions.current_id(), before);
            handle
        });

        let newer_id = rendered.unwrap().join().unwrap();
        assert_eq!(newer_id, before + 1);
        assert!(!token.is_current());
    }
}
