//! The compliance gate
//!
//! Operations on one phone number are serialised through that record's lock;
//! different phones proceed in parallel. STOP processing takes the same lock
//! as `validate_send`, so a validate that races an opt-out either sees it
//! (denied) or strictly precedes it (the next validate is denied).

use chrono::{DateTime, Local, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use leadflow_config::ComplianceConfig;

use crate::audit::{AuditEntry, AuditEvent, AuditLog};
use crate::phone::normalize_phone;
use crate::record::{ComplianceRecord, ComplianceStatus, DenyReason, OptOutReason};
use crate::ComplianceError;

/// Aggressive-language markers flagged (not blocked) on inbound content
const AGGRESSIVE_MARKERS: &[&str] = &["MUST", "URGENT", "FINAL NOTICE", "ACT NOW", "LIMITED TIME"];

/// Financial-content markers flagged on inbound content
const FINANCIAL_MARKERS: &[&str] = &["MORTGAGE", "CREDIT", "DEBT", "LOAN", "PAYMENT"];

/// Result of validating an outbound SMS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendValidation {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub daily_count: u32,
    pub monthly_count: u32,
    /// Advisory only; an out-of-hours send is allowed but noted
    pub business_hours_warning: bool,
}

/// Advisory flags raised on inbound content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentFlag {
    AggressiveLanguage,
    FinancialContent,
}

/// What `process_inbound` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InboundAction {
    OptOutProcessed,
    MessageProcessed,
}

/// Result of processing an inbound SMS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundResult {
    pub action: InboundAction,
    pub phone: String,
    /// STOP keywords that matched as whole tokens
    pub keywords_detected: Vec<String>,
    pub content_flags: Vec<ContentFlag>,
}

impl InboundResult {
    pub fn opted_out(&self) -> bool {
        self.action == InboundAction::OptOutProcessed
    }
}

/// The authority over outbound SMS
pub struct ComplianceGate {
    config: ComplianceConfig,
    records: DashMap<String, Arc<Mutex<ComplianceRecord>>>,
    audit: Arc<dyn AuditLog>,
}

impl ComplianceGate {
    pub fn new(config: ComplianceConfig, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            config,
            records: DashMap::new(),
            audit,
        }
    }

    /// Replay persisted opt-outs from the audit journal. Called once at
    /// startup; counters start conservatively at zero.
    pub async fn restore_from_audit(&self) -> Result<usize, ComplianceError> {
        let opt_outs = self.audit.load_opt_outs().await?;
        let count = opt_outs.len();
        for (phone, reason, at) in opt_outs {
            let record = self.record_for(&phone, Local::now());
            let mut guard = record.lock();
            if guard.opt_out(reason, at) {
                tracing::debug!(phone = %phone, reason = %reason.as_str(), "opt-out restored");
            }
        }
        if count > 0 {
            tracing::info!(count, "opt-outs restored from audit journal");
        }
        Ok(count)
    }

    fn record_for(&self, normalized: &str, now: DateTime<Local>) -> Arc<Mutex<ComplianceRecord>> {
        self.records
            .entry(normalized.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ComplianceRecord::new(normalized, now))))
            .clone()
    }

    /// Validate an outbound SMS against opt-out status and frequency caps.
    pub async fn validate_send(
        &self,
        phone: &str,
        content: &str,
    ) -> Result<SendValidation, ComplianceError> {
        self.validate_send_at(phone, content, Local::now()).await
    }

    /// Validation with an explicit clock, used directly by tests of the
    /// period boundaries.
    pub async fn validate_send_at(
        &self,
        phone: &str,
        _content: &str,
        now: DateTime<Local>,
    ) -> Result<SendValidation, ComplianceError> {
        let normalized = normalize_phone(phone)?;
        let record = self.record_for(&normalized, now);

        let (validation, denied) = {
            let mut guard = record.lock();
            guard.roll_periods(now);

            let deny = if guard.opted_out {
                Some(DenyReason::OptedOut)
            } else if guard.daily_count >= self.config.daily_sms_limit {
                Some(DenyReason::DailyLimit)
            } else if guard.monthly_count >= self.config.monthly_sms_limit {
                Some(DenyReason::MonthlyLimit)
            } else {
                None
            };

            let hour = chrono::Timelike::hour(&now);
            let in_hours = (self.config.business_hours_start..=self.config.business_hours_end)
                .contains(&hour);

            (
                SendValidation {
                    allowed: deny.is_none(),
                    reason: deny,
                    daily_count: guard.daily_count,
                    monthly_count: guard.monthly_count,
                    business_hours_warning: deny.is_none() && !in_hours,
                },
                deny,
            )
        };

        let event = match denied {
            Some(reason) => AuditEvent::SendDenied { reason },
            None => AuditEvent::SendAllowed {
                daily_count: validation.daily_count,
                monthly_count: validation.monthly_count,
            },
        };
        self.audit.append(&AuditEntry::new(&normalized, event)).await?;

        if let Some(reason) = denied {
            tracing::warn!(phone = %normalized, reason = %reason.as_str(), "outbound SMS denied");
        } else if validation.business_hours_warning {
            tracing::info!(phone = %normalized, "outbound SMS outside business hours");
        }

        Ok(validation)
    }

    /// Record a send attempt. Counters move only on success; failures still
    /// leave an audit entry.
    pub async fn record_send(
        &self,
        phone: &str,
        content: &str,
        success: bool,
    ) -> Result<(), ComplianceError> {
        self.record_send_at(phone, content, success, Local::now())
            .await
    }

    pub async fn record_send_at(
        &self,
        phone: &str,
        _content: &str,
        success: bool,
        now: DateTime<Local>,
    ) -> Result<(), ComplianceError> {
        let normalized = normalize_phone(phone)?;
        let record = self.record_for(&normalized, now);

        if success {
            record.lock().record_send(now);
        }

        self.audit
            .append(&AuditEntry::new(
                &normalized,
                AuditEvent::SendRecorded { success },
            ))
            .await?;

        tracing::debug!(phone = %normalized, success, "SMS send recorded");
        Ok(())
    }

    /// Process an inbound SMS: whole-token STOP keywords opt the number out
    /// before anything else sees the message.
    pub async fn process_inbound(
        &self,
        phone: &str,
        content: &str,
    ) -> Result<InboundResult, ComplianceError> {
        let normalized = normalize_phone(phone)?;

        let matched = self.matched_stop_keywords(content);
        if !matched.is_empty() {
            self.process_opt_out(&normalized, OptOutReason::StopKeyword)
                .await?;
            self.audit
                .append(&AuditEntry::new(
                    &normalized,
                    AuditEvent::InboundProcessed { opt_out: true },
                ))
                .await?;
            return Ok(InboundResult {
                action: InboundAction::OptOutProcessed,
                phone: normalized,
                keywords_detected: matched,
                content_flags: Vec::new(),
            });
        }

        let content_flags = content_flags(content);
        self.audit
            .append(&AuditEntry::new(
                &normalized,
                AuditEvent::InboundProcessed { opt_out: false },
            ))
            .await?;

        Ok(InboundResult {
            action: InboundAction::MessageProcessed,
            phone: normalized,
            keywords_detected: Vec::new(),
            content_flags,
        })
    }

    /// Opt a number out. Idempotent; repeated calls leave the gate in the
    /// same observable state.
    pub async fn process_opt_out(
        &self,
        phone: &str,
        reason: OptOutReason,
    ) -> Result<(), ComplianceError> {
        let normalized = normalize_phone(phone)?;
        let record = self.record_for(&normalized, Local::now());

        let newly_opted = record.lock().opt_out(reason, Utc::now());
        if newly_opted {
            self.audit
                .append(&AuditEntry::new(&normalized, AuditEvent::OptOut { reason }))
                .await?;
            tracing::info!(phone = %normalized, reason = %reason.as_str(), "opt-out processed");
        }
        Ok(())
    }

    /// Read-only compliance snapshot for a phone number.
    pub async fn status(&self, phone: &str) -> Result<ComplianceStatus, ComplianceError> {
        self.status_at(phone, Local::now()).await
    }

    pub async fn status_at(
        &self,
        phone: &str,
        now: DateTime<Local>,
    ) -> Result<ComplianceStatus, ComplianceError> {
        let normalized = normalize_phone(phone)?;
        let record = self.record_for(&normalized, now);
        let mut guard = record.lock();
        guard.roll_periods(now);

        let compliant = !guard.opted_out
            && guard.daily_count < self.config.daily_sms_limit
            && guard.monthly_count < self.config.monthly_sms_limit;

        Ok(ComplianceStatus {
            phone: normalized,
            opted_out: guard.opted_out,
            opt_out_reason: guard.opt_out_reason,
            opted_out_at: guard.opted_out_at,
            daily_count: guard.daily_count,
            daily_limit: self.config.daily_sms_limit,
            monthly_count: guard.monthly_count,
            monthly_limit: self.config.monthly_sms_limit,
            last_sent_at: guard.last_sent_at,
            compliant,
        })
    }

    /// Evict opt-outs past the retention floor. Runs on its own (much
    /// longer) maintenance schedule than counter rollover.
    pub fn purge_expired_opt_outs(&self, now: DateTime<Utc>) -> usize {
        let retention = self.config.opt_out_retention_days;
        let mut purged = 0;
        self.records.retain(|_, record| {
            let guard = record.lock();
            if guard.opted_out && guard.opt_out_expired(retention, now) {
                purged += 1;
                false
            } else {
                true
            }
        });
        purged
    }

    /// STOP keywords present as whole tokens in the uppercased content.
    /// "STOPWATCH" does not match; "STOP." does.
    fn matched_stop_keywords(&self, content: &str) -> Vec<String> {
        let upper = content.trim().to_uppercase();
        let tokens: Vec<&str> = upper
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .filter(|t| !t.is_empty())
            .collect();

        self.config
            .stop_keywords
            .iter()
            .filter(|kw| tokens.iter().any(|t| *t == kw.as_str()))
            .cloned()
            .collect()
    }
}

/// Advisory content scan on inbound messages
fn content_flags(content: &str) -> Vec<ContentFlag> {
    let upper = content.to_uppercase();
    let mut flags = Vec::new();
    if AGGRESSIVE_MARKERS.iter().any(|m| upper.contains(m)) {
        flags.push(ContentFlag::AggressiveLanguage);
    }
    if FINANCIAL_MARKERS.iter().any(|m| upper.contains(m)) {
        flags.push(ContentFlag::FinancialContent);
    }
    flags
}
