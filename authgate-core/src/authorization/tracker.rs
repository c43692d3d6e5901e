use std::sync::{Arc, Mutex, MutexGuard};

use rst_common::standard::chrono::Utc;
use rst_common::with_tokio::tokio::sync::watch;

use super::lifecycle::{AuthorizationView, Lifecycle, State};
use super::types::{Authorization, AuthorizationError, AuthorizationKey, Decision};

/// `Tracker` shares one [`Lifecycle`] between the poller, the submitter and
/// any number of subscribers
///
/// Every mutation republishes the whole list through a watch channel, so a
/// subscriber always sees a complete snapshot, never a half updated list.
#[derive(Clone)]
pub struct Tracker {
    lifecycle: Arc<Mutex<Lifecycle>>,
    focus: Arc<Mutex<Option<AuthorizationKey>>>,
    sender: Arc<watch::Sender<Vec<AuthorizationView>>>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            lifecycle: Arc::new(Mutex::new(Lifecycle::new())),
            focus: Arc::new(Mutex::new(None)),
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<AuthorizationView>> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> Vec<AuthorizationView> {
        self.sender.borrow().clone()
    }

    pub fn sync(&self, items: Vec<Authorization>) {
        self.mutate(|lifecycle| lifecycle.sync(items, Utc::now()));
    }

    pub fn track(&self, item: Authorization) {
        self.mutate(|lifecycle| lifecycle.track(item, Utc::now()));
    }

    /// tick refreshes the countdowns, subscribers are notified on every call
    pub fn tick(&self) -> bool {
        self.mutate(|lifecycle| lifecycle.tick(Utc::now()))
    }

    pub fn begin(
        &self,
        key: &AuthorizationKey,
        decision: Decision,
    ) -> Result<State, AuthorizationError> {
        self.mutate(|lifecycle| lifecycle.begin(key, decision, Utc::now()))
    }

    pub fn complete(
        &self,
        key: &AuthorizationKey,
        decision: Decision,
    ) -> Result<State, AuthorizationError> {
        self.mutate(|lifecycle| lifecycle.complete(key, decision))
    }

    pub fn fail(&self, key: &AuthorizationKey) -> Result<State, AuthorizationError> {
        self.mutate(|lifecycle| lifecycle.fail(key))
    }

    pub fn state(&self, key: &AuthorizationKey) -> Option<State> {
        self.lock().state(key)
    }

    pub fn get(&self, key: &AuthorizationKey) -> Option<Authorization> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &AuthorizationKey) -> bool {
        self.lock().contains(key)
    }

    pub fn position(&self, key: &AuthorizationKey) -> Option<usize> {
        self.lock().position(key)
    }

    /// request_focus remembers an item named by a push event
    pub fn request_focus(&self, key: AuthorizationKey) {
        let mut focus = self.focus.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *focus = Some(key);
    }

    /// take_focus hands out the pending focus once the item is tracked
    ///
    /// The request is kept until the item shows up in the tracked set.
    pub fn take_focus(&self) -> Option<(AuthorizationKey, usize)> {
        let mut focus = self.focus.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = focus.as_ref()?.clone();
        let position = self.position(&key)?;

        *focus = None;
        Some((key, position))
    }

    fn mutate<T>(&self, callback: impl FnOnce(&mut Lifecycle) -> T) -> T {
        let mut lifecycle = self.lock();
        let output = callback(&mut lifecycle);
        self.sender.send_replace(lifecycle.views(Utc::now()));
        output
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
