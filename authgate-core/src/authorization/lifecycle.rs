use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Serialize};

use super::types::{Authorization, AuthorizationError, AuthorizationKey, Decision};

/// State of a single authorization
///
/// `Pending` only exists between decryption and the first evaluation. `TimedOut`,
/// `Confirmed` and `Denied` are absorbing. `Error` keeps the item retryable until
/// it expires or disappears from the server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(crate = "self::serde")]
#[serde(rename_all = "camelCase")]
pub enum State {
    Pending,
    Active,
    Confirming,
    Denying,
    Confirmed,
    Denied,
    TimedOut,
    Error,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Confirmed | State::Denied | State::TimedOut)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, State::Confirming | State::Denying)
    }
}

/// remaining_seconds is `expires_at - now` rounded up to whole seconds, never negative
///
/// An item with any time left reports at least one second, so it only expires
/// once `expires_at` has actually passed.
pub fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }

    (millis + 999) / 1000
}

/// `AuthorizationView` is what subscribers observe for one authorization
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationView {
    authorization: Authorization,
    state: State,
    remaining: i64,
    progress: f64,
}

impl AuthorizationView {
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// remaining seconds before expiry
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// progress is `remaining / lifetime` in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress
    }
}

#[derive(Debug, Clone)]
struct Entry {
    authorization: Authorization,
    state: State,
}

impl Entry {
    /// evaluate applies the countdown, returns true when the state changed
    fn evaluate(&mut self, now: DateTime<Utc>) -> bool {
        let expired = remaining_seconds(self.authorization.expires_at(), now) == 0;
        let next = match self.state {
            State::Confirmed | State::Denied | State::TimedOut => self.state,
            _ if expired => State::TimedOut,
            State::Pending => State::Active,
            other => other,
        };

        let changed = next != self.state;
        self.state = next;
        changed
    }
}

/// `Lifecycle` is the single source of truth for authorization states
///
/// Entries keep the order of the last polling result, which is also the
/// position reported for push focus.
#[derive(Debug, Default)]
pub struct Lifecycle {
    entries: Vec<Entry>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// sync replaces the tracked set with a new polling result
    ///
    /// Known items keep their state, new items start as `Pending` and are evaluated
    /// right away. Items missing from the result are dropped, unless a decision for
    /// them is still in flight.
    pub fn sync(&mut self, items: Vec<Authorization>, now: DateTime<Utc>) {
        let mut previous = std::mem::take(&mut self.entries);
        let mut entries: Vec<Entry> = Vec::with_capacity(items.len());

        for authorization in items {
            let key = authorization.key();
            if entries.iter().any(|entry| entry.authorization.key() == key) {
                continue;
            }

            let state = previous
                .iter()
                .position(|entry| entry.authorization.key() == key)
                .map(|index| previous.remove(index).state)
                .unwrap_or(State::Pending);

            entries.push(Entry {
                authorization,
                state,
            });
        }

        entries.extend(
            previous
                .into_iter()
                .filter(|entry| entry.state.is_in_flight()),
        );

        self.entries = entries;
        self.tick(now);
    }

    /// track adds or refreshes a single authorization without touching the others
    pub fn track(&mut self, authorization: Authorization, now: DateTime<Utc>) {
        let key = authorization.key();
        match self.find_mut(&key) {
            Some(entry) => entry.authorization = authorization,
            None => self.entries.push(Entry {
                authorization,
                state: State::Pending,
            }),
        }

        self.tick(now);
    }

    /// tick re-evaluates every countdown, returns true when any state changed
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        self.entries
            .iter_mut()
            .fold(false, |changed, entry| entry.evaluate(now) || changed)
    }

    /// begin moves an item to `Confirming` or `Denying` before the request is sent
    pub fn begin(
        &mut self,
        key: &AuthorizationKey,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<State, AuthorizationError> {
        let entry = self
            .find_mut(key)
            .ok_or_else(|| unknown(key))?;

        entry.evaluate(now);
        match entry.state {
            State::Pending | State::Active | State::Error => {
                entry.state = match decision {
                    Decision::Confirm => State::Confirming,
                    Decision::Deny => State::Denying,
                };
                Ok(entry.state)
            }
            State::Confirming | State::Denying => Err(AuthorizationError::DecisionInFlightError(
                key.authorization_id().to_string(),
            )),
            State::TimedOut => Err(AuthorizationError::DecisionRejectedError(format!(
                "authorization {} has expired",
                key.authorization_id()
            ))),
            State::Confirmed | State::Denied => Err(AuthorizationError::DecisionRejectedError(
                format!("authorization {} is already decided", key.authorization_id()),
            )),
        }
    }

    /// complete records a server acknowledgment
    ///
    /// An item that timed out while the request was in flight stays `TimedOut`.
    pub fn complete(
        &mut self,
        key: &AuthorizationKey,
        decision: Decision,
    ) -> Result<State, AuthorizationError> {
        let entry = self
            .find_mut(key)
            .ok_or_else(|| unknown(key))?;

        if entry.state.is_in_flight() {
            entry.state = match decision {
                Decision::Confirm => State::Confirmed,
                Decision::Deny => State::Denied,
            };
        }

        Ok(entry.state)
    }

    /// fail records a non successful outcome, the caller may retry from `Error`
    pub fn fail(&mut self, key: &AuthorizationKey) -> Result<State, AuthorizationError> {
        let entry = self
            .find_mut(key)
            .ok_or_else(|| unknown(key))?;

        if entry.state.is_in_flight() {
            entry.state = State::Error;
        }

        Ok(entry.state)
    }

    pub fn state(&self, key: &AuthorizationKey) -> Option<State> {
        self.find(key).map(|entry| entry.state)
    }

    pub fn get(&self, key: &AuthorizationKey) -> Option<&Authorization> {
        self.find(key).map(|entry| &entry.authorization)
    }

    pub fn contains(&self, key: &AuthorizationKey) -> bool {
        self.find(key).is_some()
    }

    pub fn position(&self, key: &AuthorizationKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.authorization.key() == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn views(&self, now: DateTime<Utc>) -> Vec<AuthorizationView> {
        self.entries
            .iter()
            .map(|entry| {
                let remaining = remaining_seconds(entry.authorization.expires_at(), now);
                let lifetime = entry.authorization.lifetime();
                let progress = if lifetime > 0 {
                    (remaining as f64 / lifetime as f64).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                AuthorizationView {
                    authorization: entry.authorization.clone(),
                    state: entry.state,
                    remaining,
                    progress,
                }
            })
            .collect()
    }

    fn find(&self, key: &AuthorizationKey) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| &entry.authorization.key() == key)
    }

    fn find_mut(&mut self, key: &AuthorizationKey) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|entry| &entry.authorization.key() == key)
    }
}

fn unknown(key: &AuthorizationKey) -> AuthorizationError {
    AuthorizationError::UnknownAuthorizationError(format!(
        "{}/{}",
        key.connection_id(),
        key.authorization_id()
    ))
}
