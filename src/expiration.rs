//! Session expiration metadata derived from configured timeouts

use chrono::{DateTime, Duration, Utc};

/// How long an idle object lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiration {
    /// `None`, zero or negative means the object never expires
    timeout: Option<Duration>,
}

impl Expiration {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout: Some(timeout) }
    }

    /// An expiration that never elapses
    pub fn immortal() -> Self {
        Self { timeout: None }
    }

    /// Servlet-style timeout in minutes; values <= 0 never expire, nor do
    /// values too large to represent
    pub fn from_minutes(minutes: i64) -> Self {
        Duration::try_minutes(minutes).map_or_else(Self::immortal, Self::new)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_immortal(&self) -> bool {
        self.timeout.map_or(true, |t| t <= Duration::zero())
    }
}

/// Expiration plus the time of last access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationMetaData {
    expiration: Expiration,
    last_access: Option<DateTime<Utc>>,
}

impl ExpirationMetaData {
    pub fn new(expiration: Expiration) -> Self {
        Self {
            expiration,
            last_access: None,
        }
    }

    pub fn expiration(&self) -> &Expiration {
        &self.expiration
    }

    pub fn last_access(&self) -> Option<DateTime<Utc>> {
        self.last_access
    }

    /// Record an access
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_access = Some(at);
    }

    /// Expired once `last_access + timeout` lies before `now`.
    /// Never-accessed and immortal objects are not expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.expiration.is_immortal() {
            return false;
        }
        match (self.last_access, self.expiration.timeout) {
            (Some(last), Some(timeout)) => last
                .checked_add_signed(timeout)
                .map_or(false, |deadline| deadline < now),
            _ => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
