//! Lockout bookkeeping for failed logins and request floods.
//!
//! [`LockoutRegistry`] is pure state: every operation takes the current time
//! and returns what changed, so callers decide how to persist and log
//! transitions. Two triggers exist:
//!
//! - repeated failed logins for one username within a window lock that
//!   username;
//! - too many requests from one client IP within a sliding window lock
//!   that IP.
//!
//! Locks expire on their own once `locked_until` has passed.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What a lock applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Username,
    ClientIp,
}

impl LockKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::ClientIp => "client_ip",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized lock kind or reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized lock value: {0}")]
pub struct LockParseError(pub String);

impl FromStr for LockKind {
    type Err = LockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "username" => Ok(Self::Username),
            "client_ip" => Ok(Self::ClientIp),
            other => Err(LockParseError(other.to_owned())),
        }
    }
}

/// A locked username or client IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSubject {
    pub kind: LockKind,
    pub key: String,
}

impl LockSubject {
    #[must_use]
    pub fn username(name: &str) -> Self {
        Self {
            kind: LockKind::Username,
            key: name.trim().to_lowercase(),
        }
    }

    #[must_use]
    pub fn client_ip(ip: impl Into<String>) -> Self {
        Self {
            kind: LockKind::ClientIp,
            key: ip.into(),
        }
    }
}

impl fmt::Display for LockSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)
    }
}

/// Thresholds and durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub lock_duration: Duration,
    /// Failed logins that trigger a username lock.
    pub login_max_failures: u32,
    pub login_failure_window: Duration,
    /// Requests allowed per window; one more triggers an IP lock.
    pub rate_max_requests: u32,
    pub rate_window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            lock_duration: Duration::minutes(5),
            login_max_failures: 2,
            login_failure_window: Duration::minutes(5),
            rate_max_requests: 50,
            rate_window: Duration::seconds(10),
        }
    }
}

/// Why a lock was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    FailedLogins,
    RequestRate,
}

impl LockReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailedLogins => "failed_logins",
            Self::RequestRate => "request_rate",
        }
    }

    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::FailedLogins => "too many failed login attempts",
            Self::RequestRate => "too many requests",
        }
    }
}

impl FromStr for LockReason {
    type Err = LockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "failed_logins" => Ok(Self::FailedLogins),
            "request_rate" => Ok(Self::RequestRate),
            other => Err(LockParseError(other.to_owned())),
        }
    }
}

/// A change to the set of active locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTransition {
    /// A new lock was placed.
    Locked {
        subject: LockSubject,
        until: DateTime<Utc>,
        reason: LockReason,
    },
    /// An active lock was pushed further into the future.
    Extended {
        subject: LockSubject,
        until: DateTime<Utc>,
        reason: LockReason,
    },
}

impl LockTransition {
    #[must_use]
    pub const fn subject(&self) -> &LockSubject {
        match self {
            Self::Locked { subject, .. } | Self::Extended { subject, .. } => subject,
        }
    }

    #[must_use]
    pub const fn until(&self) -> DateTime<Utc> {
        match self {
            Self::Locked { until, .. } | Self::Extended { until, .. } => *until,
        }
    }

    #[must_use]
    pub const fn reason(&self) -> LockReason {
        match self {
            Self::Locked { reason, .. } | Self::Extended { reason, .. } => *reason,
        }
    }

    /// One-line description for the security log.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Locked {
                subject,
                until,
                reason,
            } => format!("locked {subject} until {until}: {}", reason.describe()),
            Self::Extended {
                subject,
                until,
                reason,
            } => format!(
                "extended lock on {subject} until {until}: {}",
                reason.describe()
            ),
        }
    }
}

/// Result of asking whether a request may proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Open,
    Locked {
        until: DateTime<Utc>,
        /// Set when this check placed or extended the lock.
        transition: Option<LockTransition>,
    },
}

impl Gate {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Registry operations between sweeps of stale counters.
const SWEEP_EVERY: u32 = 1024;

/// Active locks plus the counters that lead to them.
#[derive(Debug, Clone, Default)]
pub struct LockoutRegistry {
    policy: LockoutPolicy,
    locks: HashMap<LockSubject, (DateTime<Utc>, LockReason)>,
    login_failures: HashMap<String, VecDeque<DateTime<Utc>>>,
    requests: HashMap<String, VecDeque<DateTime<Utc>>>,
    ops_since_sweep: u32,
}

impl LockoutRegistry {
    #[must_use]
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// When the subject's lock ends, if it is currently locked.
    #[must_use]
    pub fn locked_until(&self, subject: &LockSubject, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locks
            .get(subject)
            .map(|(until, _)| *until)
            .filter(|until| *until > now)
    }

    /// Check a login attempt before verifying credentials.
    ///
    /// While the username is locked the attempt is refused and counts as a
    /// failure: the lock is extended to `now + lock_duration`.
    pub fn gate_login(&mut self, username: &str, now: DateTime<Utc>) -> Gate {
        let subject = LockSubject::username(username);
        if self.locked_until(&subject, now).is_none() {
            return Gate::Open;
        }

        let until = now + self.policy.lock_duration;
        self.locks
            .insert(subject.clone(), (until, LockReason::FailedLogins));
        Gate::Locked {
            until,
            transition: Some(LockTransition::Extended {
                subject,
                until,
                reason: LockReason::FailedLogins,
            }),
        }
    }

    /// Record a failed login. Returns the transition if this failure locked
    /// the username.
    pub fn record_login_failure(
        &mut self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Option<LockTransition> {
        self.tick(now);
        let subject = LockSubject::username(username);
        let window_start = now - self.policy.login_failure_window;

        let failures = self.login_failures.entry(subject.key.clone()).or_default();
        while failures.front().is_some_and(|t| *t <= window_start) {
            failures.pop_front();
        }
        failures.push_back(now);

        if failures.len() < self.policy.login_max_failures as usize {
            return None;
        }
        failures.clear();
        self.login_failures.remove(&subject.key);

        let until = now + self.policy.lock_duration;
        self.locks
            .insert(subject.clone(), (until, LockReason::FailedLogins));
        Some(LockTransition::Locked {
            subject,
            until,
            reason: LockReason::FailedLogins,
        })
    }

    /// Reset the failure counter after a successful login.
    pub fn record_login_success(&mut self, username: &str) {
        self.login_failures
            .remove(&LockSubject::username(username).key);
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub fn record_request(&mut self, ip: &str, now: DateTime<Utc>) -> Gate {
        self.tick(now);
        let subject = LockSubject::client_ip(ip);
        if let Some(until) = self.locked_until(&subject, now) {
            return Gate::Locked {
                until,
                transition: None,
            };
        }

        let window_start = now - self.policy.rate_window;
        let window = self.requests.entry(subject.key.clone()).or_default();
        while window.front().is_some_and(|t| *t <= window_start) {
            window.pop_front();
        }
        window.push_back(now);

        if window.len() <= self.policy.rate_max_requests as usize {
            return Gate::Open;
        }
        self.requests.remove(&subject.key);

        let until = now + self.policy.lock_duration;
        self.locks
            .insert(subject.clone(), (until, LockReason::RequestRate));
        Gate::Locked {
            until,
            transition: Some(LockTransition::Locked {
                subject,
                until,
                reason: LockReason::RequestRate,
            }),
        }
    }

    /// Reinstate a persisted lock. Expired locks are ignored.
    pub fn restore(
        &mut self,
        subject: LockSubject,
        until: DateTime<Utc>,
        reason: LockReason,
        now: DateTime<Utc>,
    ) {
        if until > now {
            self.locks.insert(subject, (until, reason));
        }
    }

    /// Currently active locks, soonest expiry first.
    #[must_use]
    pub fn active(&self, now: DateTime<Utc>) -> Vec<(LockSubject, DateTime<Utc>, LockReason)> {
        let mut active: Vec<_> = self
            .locks
            .iter()
            .filter(|(_, (until, _))| *until > now)
            .map(|(subject, (until, reason))| (subject.clone(), *until, *reason))
            .collect();
        active.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        active
    }

    /// Drop expired locks and counters that can no longer trigger a lock.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        self.locks.retain(|_, (until, _)| *until > now);

        let login_start = now - self.policy.login_failure_window;
        self.login_failures
            .retain(|_, times| times.back().is_some_and(|t| *t > login_start));

        let rate_start = now - self.policy.rate_window;
        self.requests
            .retain(|_, times| times.back().is_some_and(|t| *t > rate_start));

        self.ops_since_sweep = 0;
    }

    fn tick(&mut self, now: DateTime<Utc>) {
        self.ops_since_sweep += 1;
        if self.ops_since_sweep >= SWEEP_EVERY {
            self.sweep(now);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_two_failures_lock_username() {
        let mut reg = LockoutRegistry::default();
        assert!(reg.record_login_failure("owner", t0()).is_none());

        let second = t0() + Duration::seconds(30);
        let transition = reg.record_login_failure("Owner", second).unwrap();
        assert!(matches!(transition, LockTransition::Locked { .. }));
        assert_eq!(transition.until(), second + Duration::minutes(5));

        assert!(!reg.gate_login("owner", second + Duration::seconds(1)).is_open());
    }

    #[test]
    fn test_failures_outside_window_do_not_lock() {
        let mut reg = LockoutRegistry::default();
        reg.record_login_failure("owner", t0());
        assert!(
            reg.record_login_failure("owner", t0() + Duration::minutes(6))
                .is_none()
        );
    }

    #[test]
    fn test_success_resets_failures() {
        let mut reg = LockoutRegistry::default();
        reg.record_login_failure("owner", t0());
        reg.record_login_success("owner");
        assert!(
            reg.record_login_failure("owner", t0() + Duration::seconds(5))
                .is_none()
        );
    }

    #[test]
    fn test_attempt_while_locked_extends() {
        let mut reg = LockoutRegistry::default();
        reg.record_login_failure("owner", t0());
        reg.record_login_failure("owner", t0());

        let later = t0() + Duration::minutes(4);
        let Gate::Locked { until, transition } = reg.gate_login("owner", later) else {
            panic!("expected lock");
        };
        assert_eq!(until, later + Duration::minutes(5));
        assert!(matches!(transition, Some(LockTransition::Extended { .. })));
    }

    #[test]
    fn test_lock_expires() {
        let mut reg = LockoutRegistry::default();
        reg.record_login_failure("owner", t0());
        reg.record_login_failure("owner", t0());

        let after = t0() + Duration::minutes(5) + Duration::seconds(1);
        assert!(reg.gate_login("owner", after).is_open());
        assert!(reg.active(after).is_empty());
    }

    #[test]
    fn test_request_rate_locks_ip_on_fifty_first_request() {
        let mut reg = LockoutRegistry::default();
        for i in 0..50 {
            let now = t0() + Duration::milliseconds(i * 100);
            assert!(reg.record_request("10.0.0.1", now).is_open());
        }
        let gate = reg.record_request("10.0.0.1", t0() + Duration::seconds(6));
        let Gate::Locked { transition, .. } = gate else {
            panic!("expected lock");
        };
        assert!(matches!(
            transition,
            Some(LockTransition::Locked {
                reason: LockReason::RequestRate,
                ..
            })
        ));

        let gate = reg.record_request("10.0.0.1", t0() + Duration::seconds(7));
        assert!(matches!(gate, Gate::Locked { transition: None, .. }));
        assert!(reg.record_request("10.0.0.2", t0()).is_open());
    }

    #[test]
    fn test_request_window_slides() {
        let mut reg = LockoutRegistry::default();
        for i in 0..50 {
            reg.record_request("10.0.0.1", t0() + Duration::milliseconds(i * 10));
        }
        assert!(
            reg.record_request("10.0.0.1", t0() + Duration::seconds(11))
                .is_open()
        );
    }

    #[test]
    fn test_restore_and_clear() {
        let mut reg = LockoutRegistry::default();
        let subject = LockSubject::client_ip("192.0.2.7");
        reg.restore(
            subject.clone(),
            t0() - Duration::seconds(1),
            LockReason::RequestRate,
            t0(),
        );
        assert!(reg.locked_until(&subject, t0()).is_none());

        reg.restore(
            subject.clone(),
            t0() + Duration::minutes(2),
            LockReason::RequestRate,
            t0(),
        );
        assert_eq!(reg.active(t0()).len(), 1);
    }

    #[test]
    fn test_sweep_drops_stale_entries() {
        let mut reg = LockoutRegistry::default();
        reg.record_request("10.0.0.1", t0());
        reg.record_login_failure("owner", t0());
        reg.sweep(t0() + Duration::hours(1));
        assert!(reg.requests.is_empty());
        assert!(reg.login_failures.is_empty());
    }

    #[test]
    fn test_lock_kind_parse() {
        assert_eq!("client_ip".parse::<LockKind>().unwrap(), LockKind::ClientIp);
        assert!("ip".parse::<LockKind>().is_err());
    }
}
