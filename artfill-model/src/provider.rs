use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classified provider failure, as reported to the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider rejected our credentials. Triggers the long cooldown.
    Auth,
    /// Provider asked us to back off. Triggers the short cooldown.
    RateLimited,
    /// Network error or provider 5xx.
    Transient,
}

/// Durable cooldown and quota bookkeeping for one provider.
///
/// Invariants: while `now < cooldown_until` the provider must not be
/// queried regardless of quota; once `quota_used >= quota_limit` the
/// provider must not be queried until the daily reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quota_used: u32,
    /// Daily query allowance; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_limit: Option<u32>,
    /// Local calendar day the current usage counter belongs to.
    pub quota_day: NaiveDate,
}

impl ProviderRecord {
    pub fn new(
        name: impl Into<String>,
        quota_limit: Option<u32>,
        today: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            cooldown_until: None,
            quota_used: 0,
            quota_limit,
            quota_day: today,
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    pub fn quota_exhausted(&self) -> bool {
        self.quota_limit
            .is_some_and(|limit| self.quota_used >= limit)
    }
}

/// Point-in-time usage view of one provider, surfaced via run status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub name: String,
    pub enabled: bool,
    pub used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
}
