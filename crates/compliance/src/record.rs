//! Per-phone compliance records and period bookkeeping
//!
//! Each record carries a daily counter tied to a calendar date and a monthly
//! counter tied to a calendar month, both in local time. Rollover is lazy:
//! any operation first rolls stale periods forward, so no background timer
//! is needed.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Why a phone number was opted out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptOutReason {
    UserRequest,
    StopKeyword,
    AdminBlock,
    FrequencyAbuse,
    ComplianceViolation,
}

impl OptOutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptOutReason::UserRequest => "user-request",
            OptOutReason::StopKeyword => "stop-keyword",
            OptOutReason::AdminBlock => "admin-block",
            OptOutReason::FrequencyAbuse => "frequency-abuse",
            OptOutReason::ComplianceViolation => "compliance-violation",
        }
    }
}

/// Why a send was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    OptedOut,
    DailyLimit,
    MonthlyLimit,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::OptedOut => "opted-out",
            DenyReason::DailyLimit => "daily-limit",
            DenyReason::MonthlyLimit => "monthly-limit",
        }
    }
}

/// Mutable per-phone compliance state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub phone: String,
    pub opted_out: bool,
    pub opt_out_reason: Option<OptOutReason>,
    pub opted_out_at: Option<DateTime<Utc>>,
    pub daily_count: u32,
    /// Calendar date (local) the daily counter belongs to
    pub daily_period: NaiveDate,
    pub monthly_count: u32,
    /// (year, month) the monthly counter belongs to, local time
    pub monthly_period: (i32, u32),
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl ComplianceRecord {
    pub fn new(phone: impl Into<String>, now: DateTime<Local>) -> Self {
        Self {
            phone: phone.into(),
            opted_out: false,
            opt_out_reason: None,
            opted_out_at: None,
            daily_count: 0,
            daily_period: now.date_naive(),
            monthly_count: 0,
            monthly_period: (now.year(), now.month()),
            last_sent_at: None,
        }
    }

    /// Reset any counter whose stored period no longer matches `now`.
    /// Called at the top of every operation on the record.
    pub fn roll_periods(&mut self, now: DateTime<Local>) {
        let today = now.date_naive();
        if self.daily_period != today {
            self.daily_count = 0;
            self.daily_period = today;
        }

        let this_month = (now.year(), now.month());
        if self.monthly_period != this_month {
            self.monthly_count = 0;
            self.monthly_period = this_month;
        }
    }

    /// Apply a successful send: both counters up, last-sent stamped.
    pub fn record_send(&mut self, now: DateTime<Local>) {
        self.roll_periods(now);
        self.daily_count += 1;
        self.monthly_count += 1;
        self.last_sent_at = Some(now.with_timezone(&Utc));
    }

    /// Mark opted out. Idempotent: an already opted-out record keeps its
    /// original reason and timestamp.
    pub fn opt_out(&mut self, reason: OptOutReason, now: DateTime<Utc>) -> bool {
        if self.opted_out {
            return false;
        }
        self.opted_out = true;
        self.opt_out_reason = Some(reason);
        self.opted_out_at = Some(now);
        true
    }

    /// Whether the opt-out has passed the retention floor. Expired opt-outs
    /// are still honoured until a maintenance pass removes them; this only
    /// gates eviction, never sending.
    pub fn opt_out_expired(&self, retention_days: u32, now: DateTime<Utc>) -> bool {
        match self.opted_out_at {
            Some(at) => now - at >= chrono::Duration::days(retention_days as i64),
            None => false,
        }
    }
}

/// Read-only snapshot returned by the gate's status operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceStatus {
    pub phone: String,
    pub opted_out: bool,
    pub opt_out_reason: Option<OptOutReason>,
    pub opted_out_at: Option<DateTime<Utc>>,
    pub daily_count: u32,
    pub daily_limit: u32,
    pub monthly_count: u32,
    pub monthly_limit: u32,
    pub last_sent_at: Option<DateTime<Utc>>,
    /// False when opted out or at either frequency cap
    pub compliant: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_daily_rollover_at_midnight() {
        let mut record = ComplianceRecord::new("+15125550100", local(2026, 3, 10, 14, 0));
        record.record_send(local(2026, 3, 10, 14, 0));
        record.record_send(local(2026, 3, 10, 18, 0));
        assert_eq!(record.daily_count, 2);

        record.roll_periods(local(2026, 3, 11, 0, 1));
        assert_eq!(record.daily_count, 0);
        assert_eq!(record.monthly_count, 2, "monthly survives the day boundary");
    }

    #[test]
    fn test_monthly_rollover_at_first_of_month() {
        let mut record = ComplianceRecord::new("+15125550100", local(2026, 3, 31, 23, 59));
        record.monthly_count = 19;
        record.record_send(local(2026, 3, 31, 23, 59));
        assert_eq!(record.monthly_count, 20);

        record.roll_periods(local(2026, 4, 1, 0, 0));
        assert_eq!(record.monthly_count, 0);
        assert_eq!(record.daily_count, 0, "daily also resets at midnight");
    }

    #[test]
    fn test_opt_out_idempotent() {
        let mut record = ComplianceRecord::new("+15125550100", local(2026, 3, 10, 9, 0));
        let first = record.opt_out(OptOutReason::StopKeyword, Utc::now());
        let original_at = record.opted_out_at;

        let second = record.opt_out(OptOutReason::UserRequest, Utc::now());
        assert!(first);
        assert!(!second);
        assert_eq!(record.opt_out_reason, Some(OptOutReason::StopKeyword));
        assert_eq!(record.opted_out_at, original_at);
    }

    #[test]
    fn test_opt_out_expiry_is_two_years() {
        let mut record = ComplianceRecord::new("+15125550100", local(2026, 3, 10, 9, 0));
        let opted_at = Utc::now();
        record.opt_out(OptOutReason::StopKeyword, opted_at);

        assert!(!record.opt_out_expired(730, opted_at + chrono::Duration::days(729)));
        assert!(record.opt_out_expired(730, opted_at + chrono::Duration::days(730)));
    }
}
