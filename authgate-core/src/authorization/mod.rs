//! `authorization` covers everything after a connection is paired: fetching and
//! opening pending authorizations, tracking their countdown and state, and sending
//! the user's decision back
pub mod types;

pub mod response;

mod lifecycle;
pub use lifecycle::{remaining_seconds, AuthorizationView, Lifecycle, State};

mod tracker;
pub use tracker::Tracker;

mod poller;
pub use poller::{CycleOutcome, Poller, PollerHandle, DEFAULT_POLL_INTERVAL};

mod submitter;
pub use submitter::DecisionSubmitter;

mod revoker;
pub use revoker::ConnectionRevoker;

#[cfg(test)]
mod testing;
