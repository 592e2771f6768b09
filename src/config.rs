use std::env;

use crate::jobs::JobConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub automation: AutomationConfig,
    pub jobs: JobConfig,
}

/// Thresholds used by the periodic automation scans.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Days without activity before a lead counts as inactive.
    pub lead_inactive_days: i64,
    /// Days without an update before a deal counts as stale.
    pub deal_stale_days: i64,
    /// Pipeline stage watched by the stale-deal scan.
    pub deal_stale_stage: String,
    pub sla_auto_escalation_enabled: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            lead_inactive_days: 3,
            deal_stale_days: 2,
            deal_stale_stage: "Negotiation".to_string(),
            sla_auto_escalation_enabled: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let automation = AutomationConfig {
            lead_inactive_days: env::var("LEAD_INACTIVE_DAYS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
            deal_stale_days: env::var("DEAL_STALE_DAYS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            deal_stale_stage: env::var("DEAL_STALE_STAGE")
                .unwrap_or_else(|_| "Negotiation".to_string()),
            sla_auto_escalation_enabled: env::var("SLA_AUTO_ESCALATION")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        let jobs = JobConfig {
            sla_check_interval_minutes: env::var("SLA_CHECK_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            drip_check_interval_minutes: env::var("DRIP_CHECK_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            lead_nurturing_interval_hours: env::var("LEAD_NURTURING_INTERVAL_HOURS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            deal_follow_up_interval_hours: env::var("DEAL_FOLLOW_UP_INTERVAL_HOURS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            follow_up_scan_hour: env::var("FOLLOW_UP_SCAN_HOUR")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            scoring_refresh_hour: env::var("SCORING_REFRESH_HOUR")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
        };

        Ok(Config { automation, jobs })
    }
}
