//! Owner dashboard session state.
//!
//! [`OwnerSession`] tracks whether the dashboard holds a usable token.
//! [`LockState`] is independent of it: a locked dashboard refuses every
//! interactive action until the lock runs out, whether or not a token is
//! held.

use chrono::{DateTime, Utc};

/// Why an authenticated session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Logout,
    VerificationFailed,
    Expired,
    SuspiciousActivity,
}

/// Dashboard authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OwnerSession {
    #[default]
    Unauthenticated,
    Authenticated {
        token: String,
        username: String,
        expires_at: DateTime<Utc>,
    },
}

impl OwnerSession {
    /// Enter the authenticated state after a login or registration.
    pub fn authenticate(
        &mut self,
        token: impl Into<String>,
        username: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) {
        *self = Self::Authenticated {
            token: token.into(),
            username: username.into(),
            expires_at,
        };
    }

    /// Leave the authenticated state. Returns `None` if already signed out.
    pub fn end(&mut self, reason: SessionEnd) -> Option<SessionEnd> {
        if matches!(self, Self::Unauthenticated) {
            return None;
        }
        *self = Self::Unauthenticated;
        Some(reason)
    }

    /// The bearer token, if still valid at `now`.
    ///
    /// An expired token ends the session.
    pub fn token(&mut self, now: DateTime<Utc>) -> Option<&str> {
        let expired =
            matches!(self, Self::Authenticated { expires_at, .. } if *expires_at <= now);
        if expired {
            self.end(SessionEnd::Expired);
        }
        match self {
            Self::Authenticated { token, .. } => Some(token.as_str()),
            Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Authenticated { username, .. } => Some(username.as_str()),
            Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        matches!(self, Self::Authenticated { expires_at, .. } if *expires_at > now)
    }
}

/// Dashboard lock state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked { until: DateTime<Utc> },
}

impl LockState {
    /// Lock until `until`. An existing later lock is kept.
    pub fn lock(&mut self, until: DateTime<Utc>) {
        if let Self::Locked { until: current } = self
            && *current >= until
        {
            return;
        }
        *self = Self::Locked { until };
    }

    /// Whether the dashboard is locked at `now`. Unlocks once `until` passes.
    pub fn is_locked(&mut self, now: DateTime<Utc>) -> bool {
        if let Self::Locked { until } = *self
            && until <= now
        {
            *self = Self::Unlocked;
        }
        matches!(self, Self::Locked { .. })
    }

    /// Run `action` unless locked.
    ///
    /// # Errors
    ///
    /// Returns the lock's end time while locked.
    pub fn guard<T>(
        &mut self,
        now: DateTime<Utc>,
        action: impl FnOnce() -> T,
    ) -> Result<T, DateTime<Utc>> {
        if self.is_locked(now)
            && let Self::Locked { until } = *self
        {
            return Err(until);
        }
        Ok(action())
    }
}
