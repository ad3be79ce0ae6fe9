//! User identity and sign-in state.
//!
//! Record operations never consult ambient global state to find out who is
//! signed in. Callers hold an [AuthWatcher], resolve it to a [Session] with
//! [require_session], and pass that session to every operation that writes
//! owner-scoped records.

use tokio::sync::watch;

use crate::Error;

/// Opaque identifier for a signed-in user, assigned by the identity
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Create a user ID from the identity provider's identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The signed-in user's ID, used to scope record ownership.
    pub user_id: UserId,
}

impl Session {
    /// Create a session for the given user.
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// The sign-in state reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The provider has not yet reported whether a user is signed in.
    #[default]
    Loading,
    /// No user is signed in.
    SignedOut,
    /// A user is signed in.
    SignedIn(Session),
}

impl AuthState {
    /// The session, if a user is signed in.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedIn(session) => Some(session),
            AuthState::Loading | AuthState::SignedOut => None,
        }
    }
}

/// Resolve an auth state to a session.
///
/// # Errors
///
/// Returns [Error::NotSignedIn] while the provider is still loading or when
/// no user is signed in.
pub fn require_session(state: &AuthState) -> Result<&Session, Error> {
    state.session().ok_or(Error::NotSignedIn)
}

/// The writer half of the sign-in state channel.
///
/// The integration that talks to the identity provider owns the channel and
/// pushes each state transition into it. Any number of [AuthWatcher]s can
/// observe the latest state.
#[derive(Debug)]
pub struct AuthChannel {
    sender: watch::Sender<AuthState>,
}

impl AuthChannel {
    /// Create a channel in the [AuthState::Loading] state.
    pub fn new() -> Self {
        Self {
            sender: watch::channel(AuthState::Loading).0,
        }
    }

    /// Report that a user signed in.
    pub fn set_signed_in(&self, session: Session) {
        self.sender.send_replace(AuthState::SignedIn(session));
    }

    /// Report that the user signed out (or that no user was signed in once
    /// loading finished).
    pub fn set_signed_out(&self) {
        self.sender.send_replace(AuthState::SignedOut);
    }

    /// Create a watcher observing this channel.
    pub fn watcher(&self) -> AuthWatcher {
        AuthWatcher {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for AuthChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The reader half of the sign-in state channel.
#[derive(Debug, Clone)]
pub struct AuthWatcher {
    receiver: watch::Receiver<AuthState>,
}

impl AuthWatcher {
    /// The latest sign-in state, marking it as seen.
    pub fn current(&mut self) -> AuthState {
        self.receiver.borrow_and_update().clone()
    }

    /// Whether a state transition arrived since the last call to
    /// [AuthWatcher::current].
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] when the [AuthChannel] was
    /// dropped.
    pub fn has_changed(&self) -> Result<bool, Error> {
        self.receiver
            .has_changed()
            .map_err(|_| Error::SubscriptionClosed)
    }

    /// Wait for the next state transition.
    ///
    /// # Errors
    ///
    /// Returns [Error::SubscriptionClosed] when the [AuthChannel] was
    /// dropped.
    pub async fn changed(&mut self) -> Result<(), Error> {
        self.receiver
            .changed()
            .await
            .map_err(|_| Error::SubscriptionClosed)
    }
}

#[cfg(test)]
mod require_session_tests {
    use crate::Error;

    use super::{AuthState, Session, UserId, require_session};

    #[test]
    fn signed_in_yields_the_session() {
        let session = Session::new(UserId::new("user-1"));
        let state = AuthState::SignedIn(session.clone());

        assert_eq!(require_session(&state), Ok(&session));
    }

    #[test]
    fn loading_is_not_signed_in() {
        assert_eq!(require_session(&AuthState::Loading), Err(Error::NotSignedIn));
    }

    #[test]
    fn signed_out_is_not_signed_in() {
        assert_eq!(
            require_session(&AuthState::SignedOut),
            Err(Error::NotSignedIn)
        );
    }
}
