//! Access control: membership record, policy evaluation, usage ledger.
//!
//! The [`AccessRecord`] is the persisted permission state: admin, white
//! and black lists for users and groups, plus the per-day usage ledger.
//! It is read on every inbound message and written only when an explicit
//! mutation happens (admin edits, usage increments), so readers take no
//! exclusive lock.
//!
//! Evaluation order is fixed and deterministic: admin identity overrides
//! everything, blacklisting overrides whitelisting, group messages require
//! a white-listed group, and the global enable flag gates whatever is
//! left. Denials are silent by design; the caller sends no reply.

use crate::message::{GroupId, Sender, UserId};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Outcome of an access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Persisted permission lists plus the usage ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessRecord {
    #[serde(default)]
    pub admin_users: BTreeSet<UserId>,
    #[serde(default)]
    pub white_users: BTreeSet<UserId>,
    #[serde(default)]
    pub black_users: BTreeSet<UserId>,
    #[serde(default)]
    pub white_groups: BTreeSet<GroupId>,
    #[serde(default)]
    pub black_groups: BTreeSet<GroupId>,
    #[serde(default)]
    pub usage: UsageLedger,
}

impl AccessRecord {
    /// Load the record from `path`. A missing file yields the empty record.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "access record absent, starting empty");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read access record: {}", path.display()))?;
        let record: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse access record: {}", path.display()))?;
        Ok(record)
    }

    /// Save the record to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create record dir: {}", parent.display())
            })?;
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize access record")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write access record: {}", path.display()))?;
        Ok(())
    }

    pub fn is_admin(&self, user: &UserId) -> bool {
        self.admin_users.contains(user)
    }
}

/// Pure access evaluation over the current record and enable flag.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Decide whether `sender` may use the system right now.
    pub fn evaluate(record: &AccessRecord, enabled: bool, sender: &Sender) -> Decision {
        if record.is_admin(&sender.user) {
            return Decision::Allowed;
        }
        if record.black_users.contains(&sender.user) {
            return Decision::Denied;
        }
        if let Some(group) = &sender.group {
            if record.black_groups.contains(group) {
                return Decision::Denied;
            }
            if !record.white_groups.contains(group) {
                return Decision::Denied;
            }
        }
        if !enabled {
            return Decision::Denied;
        }
        Decision::Allowed
    }
}

/// Per-user submission counters, bucketed by UTC day.
///
/// Only the current day's bucket is kept per user; recording on a new day
/// resets the counter, so the ledger prunes itself as it is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageLedger {
    #[serde(default)]
    entries: BTreeMap<UserId, DayUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DayUsage {
    day: NaiveDate,
    count: u32,
}

impl UsageLedger {
    /// Submissions recorded for `user` on `day`.
    pub fn count_on(&self, user: &UserId, day: NaiveDate) -> u32 {
        self.entries
            .get(user)
            .filter(|usage| usage.day == day)
            .map_or(0, |usage| usage.count)
    }

    /// Record one submission for `user` on `day`; returns the new count.
    pub fn record(&mut self, user: &UserId, day: NaiveDate) -> u32 {
        let entry = self
            .entries
            .entry(user.clone())
            .and_modify(|usage| {
                if usage.day != day {
                    usage.day = day;
                    usage.count = 0;
                }
            })
            .or_insert(DayUsage { day, count: 0 });
        entry.count += 1;
        entry.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;

    fn record_with(
        admins: &[&str],
        black_users: &[&str],
        white_groups: &[&str],
        black_groups: &[&str],
    ) -> AccessRecord {
        AccessRecord {
            admin_users: admins.iter().map(|u| UserId::from(*u)).collect(),
            black_users: black_users.iter().map(|u| UserId::from(*u)).collect(),
            white_groups: white_groups.iter().map(|g| GroupId::from(*g)).collect(),
            black_groups: black_groups.iter().map(|g| GroupId::from(*g)).collect(),
            ..AccessRecord::default()
        }
    }

    #[test]
    fn test_admin_overrides_blacklist_and_enable_flag() {
        let record = record_with(&["boss"], &["boss"], &[], &["g"]);
        let in_black_group = Sender::in_group("boss", "g");
        assert!(AccessPolicy::evaluate(&record, false, &in_black_group).is_allowed());
    }

    #[test]
    fn test_blacklisted_user_denied() {
        let record = record_with(&[], &["troll"], &["g"], &[]);
        assert!(!AccessPolicy::evaluate(&record, true, &Sender::direct("troll")).is_allowed());
        assert!(!AccessPolicy::evaluate(&record, true, &Sender::in_group("troll", "g")).is_allowed());
    }

    #[test]
    fn test_blacklisted_group_blocks_whitelisted_user() {
        let mut record = record_with(&[], &[], &["g"], &["g"]);
        record.white_users.insert(UserId::from("friend"));
        let sender = Sender::in_group("friend", "g");
        assert!(!AccessPolicy::evaluate(&record, true, &sender).is_allowed());
    }

    #[test]
    fn test_group_must_be_whitelisted() {
        let record = record_with(&[], &[], &["good"], &[]);
        assert!(AccessPolicy::evaluate(&record, true, &Sender::in_group("u", "good")).is_allowed());
        assert!(!AccessPolicy::evaluate(&record, true, &Sender::in_group("u", "other")).is_allowed());
    }

    #[test]
    fn test_direct_message_allowed_when_enabled() {
        let record = AccessRecord::default();
        assert!(AccessPolicy::evaluate(&record, true, &Sender::direct("u")).is_allowed());
        assert!(!AccessPolicy::evaluate(&record, false, &Sender::direct("u")).is_allowed());
    }

    #[test]
    fn test_usage_ledger_counts_and_resets_per_day() {
        let mut ledger = UsageLedger::default();
        let user = UserId::from("u");
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        assert_eq!(ledger.count_on(&user, monday), 0);
        assert_eq!(ledger.record(&user, monday), 1);
        assert_eq!(ledger.record(&user, monday), 2);
        assert_eq!(ledger.count_on(&user, monday), 2);

        // day rollover resets the bucket
        assert_eq!(ledger.count_on(&user, tuesday), 0);
        assert_eq!(ledger.record(&user, tuesday), 1);
    }

    #[test]
    fn test_record_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.json");

        let mut record = record_with(&["boss"], &["troll"], &["g1"], &[]);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        record.usage.record(&UserId::from("u"), day);
        record.save(&path).unwrap();

        let loaded = AccessRecord::load(&path).unwrap();
        assert!(loaded.is_admin(&UserId::from("boss")));
        assert!(loaded.black_users.contains(&UserId::from("troll")));
        assert_eq!(loaded.usage.count_on(&UserId::from("u"), day), 1);
    }

    #[test]
    fn test_load_missing_file_yields_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let record = AccessRecord::load(&dir.path().join("absent.json")).unwrap();
        assert!(record.admin_users.is_empty());
    }
}
