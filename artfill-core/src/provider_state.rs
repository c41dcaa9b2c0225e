//! Durable per-provider cooldown and daily-quota bookkeeping.
//!
//! A provider inside its cooldown window is excluded from selection
//! regardless of quota; a provider at its daily limit is excluded until
//! the local-midnight reset. Auth failures cool a provider down for 12
//! hours so one bad key cannot cause a retry storm; rate limiting cools
//! it down for 30 minutes.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;

use artfill_model::{FailureKind, ProviderRecord, ProviderUsage};

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::StateStore;

pub const PROVIDERS_FILE: &str = "providers.json";

const AUTH_COOLDOWN_HOURS: i64 = 12;
const RATE_LIMIT_COOLDOWN_MINUTES: i64 = 30;

/// Built-in daily allowances; providers without a documented limit are
/// unlimited.
pub fn default_daily_quota(provider: &str) -> Option<u32> {
    match provider {
        "tmdb" | "omdb" => Some(1000),
        _ => None,
    }
}

/// Shared, concurrently-updated provider records, persisted through the
/// injected [`StateStore`]. An in-memory-only deployment would lose
/// cooldowns across restarts, so production always wires a durable store.
#[derive(Debug)]
pub struct ProviderStateStore {
    records: DashMap<String, ProviderRecord>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
}

impl ProviderStateStore {
    pub async fn load(
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let records = DashMap::new();
        if let Some(bytes) = store.load(PROVIDERS_FILE).await? {
            match serde_json::from_slice::<Vec<ProviderRecord>>(&bytes) {
                Ok(loaded) => {
                    for record in loaded {
                        records.insert(record.name.clone(), record);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        "provider state file unreadable; starting fresh"
                    );
                }
            }
        }
        Ok(Self {
            records,
            store,
            clock,
        })
    }

    /// Make sure a record exists for every provider the run may touch.
    pub fn ensure_known(&self, names: &[String]) {
        for name in names {
            self.records.entry(name.clone()).or_insert_with(|| {
                ProviderRecord::new(
                    name.clone(),
                    default_daily_quota(name),
                    self.clock.local_date(),
                )
            });
        }
    }

    /// Cheap availability pre-filter: enabled, outside cooldown, and
    /// under quota. Consumption itself goes through
    /// [`ProviderStateStore::try_charge`], which re-validates.
    pub fn is_available(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let today = self.clock.local_date();
        match self.records.get_mut(provider).as_deref_mut() {
            Some(record) => {
                reset_record_if_due(record, today);
                record.enabled
                    && !record.in_cooldown(now)
                    && !record.quota_exhausted()
            }
            None => false,
        }
    }

    /// Record a classified failure. Transient failures leave the record
    /// untouched; retry policy for those lives in the resolver.
    pub fn record_failure(&self, provider: &str, kind: FailureKind) {
        let cooldown = match kind {
            FailureKind::Auth => {
                Some(Duration::hours(AUTH_COOLDOWN_HOURS))
            }
            FailureKind::RateLimited => {
                Some(Duration::minutes(RATE_LIMIT_COOLDOWN_MINUTES))
            }
            FailureKind::Transient => None,
        };
        let Some(cooldown) = cooldown else {
            return;
        };
        let until = self.clock.now() + cooldown;
        if let Some(mut record) = self.records.get_mut(provider) {
            record.cooldown_until = Some(until);
            tracing::warn!(
                provider,
                ?kind,
                %until,
                "provider placed in cooldown"
            );
        }
    }

    /// Reserve one unit of quota before a query is sent. The day, the
    /// cooldown, and the limit are all re-validated under the record's
    /// entry lock and the counter incremented in the same critical
    /// section, so concurrent callers racing past `is_available` can
    /// never push usage over the configured limit.
    pub fn try_charge(&self, provider: &str) -> bool {
        let now = self.clock.now();
        let today = self.clock.local_date();
        match self.records.get_mut(provider).as_deref_mut() {
            Some(record) => {
                reset_record_if_due(record, today);
                if !record.enabled
                    || record.in_cooldown(now)
                    || record.quota_exhausted()
                {
                    return false;
                }
                record.quota_used = record.quota_used.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Clear usage counters whose day has rolled over.
    pub fn reset_if_due(&self) {
        let today = self.clock.local_date();
        for mut entry in self.records.iter_mut() {
            reset_record_if_due(&mut entry, today);
        }
    }

    pub fn set_enabled(&self, provider: &str, enabled: bool) {
        if let Some(mut record) = self.records.get_mut(provider) {
            record.enabled = enabled;
        }
    }

    pub fn usage_snapshot(&self) -> Vec<ProviderUsage> {
        let mut usage: Vec<ProviderUsage> = self
            .records
            .iter()
            .map(|entry| ProviderUsage {
                name: entry.name.clone(),
                enabled: entry.enabled,
                used: entry.quota_used,
                limit: entry.quota_limit,
                remaining: entry
                    .quota_limit
                    .map(|limit| limit.saturating_sub(entry.quota_used)),
                cooldown_until: entry.cooldown_until,
            })
            .collect();
        usage.sort_by(|a, b| a.name.cmp(&b.name));
        usage
    }

    pub async fn persist(&self) -> Result<()> {
        let mut records: Vec<ProviderRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        let bytes = serde_json::to_vec_pretty(&records)?;
        self.store.save(PROVIDERS_FILE, &bytes).await
    }
}

fn reset_record_if_due(
    record: &mut ProviderRecord,
    today: chrono::NaiveDate,
) {
    if record.quota_day != today {
        record.quota_day = today;
        record.quota_used = 0;
    }
}
