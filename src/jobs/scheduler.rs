// Central scheduler for all background automation jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler as TokioScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

use super::runner::{self, RunSummary};
use crate::config::AutomationConfig;
use crate::notify::Notifier;
use crate::store::Store;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] JobSchedulerError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub sla_check_interval_minutes: u32,
    pub drip_check_interval_minutes: u32,
    pub lead_nurturing_interval_hours: u32,
    pub deal_follow_up_interval_hours: u32,
    /// Hour of day (UTC) for the daily follow-up rule scan.
    pub follow_up_scan_hour: u32,
    /// Hour of day (UTC) for the daily score recomputation.
    pub scoring_refresh_hour: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            sla_check_interval_minutes: 30,
            drip_check_interval_minutes: 15,
            lead_nurturing_interval_hours: 1,
            deal_follow_up_interval_hours: 2,
            follow_up_scan_hour: 6,
            scoring_refresh_hour: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionLog {
    pub id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub items_processed: usize,
    pub errors: Vec<String>,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum JobStatus {
    Completed,
    PartialFailure,
}

pub struct JobScheduler {
    scheduler: TokioScheduler,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    automation: AutomationConfig,
    config: JobConfig,
    execution_logs: Arc<RwLock<Vec<JobExecutionLog>>>,
}

async fn record_run(
    logs: &RwLock<Vec<JobExecutionLog>>,
    job_name: &str,
    started_at: DateTime<Utc>,
    summary: RunSummary,
) {
    let completed_at = Utc::now();
    let status = if summary.errors.is_empty() {
        JobStatus::Completed
    } else {
        JobStatus::PartialFailure
    };

    info!(
        job = job_name,
        items = summary.items_processed,
        errors = summary.errors.len(),
        "job run completed"
    );

    let log = JobExecutionLog {
        id: Uuid::new_v4(),
        job_name: job_name.to_string(),
        started_at,
        completed_at: Some(completed_at),
        status,
        items_processed: summary.items_processed,
        errors: summary.errors,
        duration_ms: Some((completed_at - started_at).num_milliseconds()),
    };

    let mut logs = logs.write().await;
    logs.push(log);
    // Keep only the last 100 runs.
    if logs.len() > 100 {
        logs.remove(0);
    }
}

impl JobScheduler {
    pub async fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        automation: AutomationConfig,
        config: JobConfig,
    ) -> JobResult<Self> {
        let scheduler = TokioScheduler::new().await?;

        Ok(Self {
            scheduler,
            store,
            notifier,
            automation,
            config,
            execution_logs: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub async fn start(&self) -> JobResult<()> {
        info!("Starting background job scheduler");

        self.schedule_sla_check().await?;
        self.schedule_drip_runner().await?;
        self.schedule_lead_nurturing().await?;
        self.schedule_deal_follow_up().await?;
        self.schedule_follow_up_scan().await?;
        self.schedule_score_refresh().await?;

        self.scheduler.start().await?;

        info!("Background job scheduler started successfully");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> JobResult<()> {
        info!("Shutting down background job scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }

    async fn schedule_sla_check(&self) -> JobResult<()> {
        let interval = self.config.sla_check_interval_minutes;
        let cron_expr = format!("0 */{} * * * *", interval);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let automation = self.automation.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let automation = automation.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                info!("Running SLA check job");
                let summary = runner::run_sla_scan(store, notifier, &automation).await;
                record_run(&logs, "SLA Check", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled SLA check to run every {} minutes", interval);

        Ok(())
    }

    async fn schedule_drip_runner(&self) -> JobResult<()> {
        let interval = self.config.drip_check_interval_minutes;
        let cron_expr = format!("0 */{} * * * *", interval);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                let summary = runner::run_drip_steps(store, notifier).await;
                record_run(&logs, "Drip Runner", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled drip runner to run every {} minutes", interval);

        Ok(())
    }

    async fn schedule_lead_nurturing(&self) -> JobResult<()> {
        let interval = self.config.lead_nurturing_interval_hours;
        let cron_expr = format!("0 0 */{} * * *", interval);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let automation = self.automation.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let automation = automation.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                info!("Running lead nurturing job");
                let summary = runner::run_lead_nurturing(store, notifier, &automation).await;
                record_run(&logs, "Lead Nurturing", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled lead nurturing to run every {} hours", interval);

        Ok(())
    }

    async fn schedule_deal_follow_up(&self) -> JobResult<()> {
        let interval = self.config.deal_follow_up_interval_hours;
        let cron_expr = format!("0 0 */{} * * *", interval);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let automation = self.automation.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let automation = automation.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                info!("Running stale deal follow-up job");
                let summary = runner::run_deal_follow_ups(store, notifier, &automation).await;
                record_run(&logs, "Deal Follow-up", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled deal follow-up to run every {} hours", interval);

        Ok(())
    }

    async fn schedule_follow_up_scan(&self) -> JobResult<()> {
        let hour = self.config.follow_up_scan_hour;
        let cron_expr = format!("0 0 {} * * *", hour);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                info!("Running follow-up rule scan");
                let summary = runner::run_follow_up_rules(store, notifier).await;
                record_run(&logs, "Follow-up Scan", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled follow-up rule scan daily at {}:00 UTC", hour);

        Ok(())
    }

    async fn schedule_score_refresh(&self) -> JobResult<()> {
        let hour = self.config.scoring_refresh_hour;
        let cron_expr = format!("0 0 {} * * *", hour);

        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let notifier = notifier.clone();
            let logs = logs.clone();

            Box::pin(async move {
                let started_at = Utc::now();
                info!("Running daily score refresh");
                let summary = runner::run_daily_scoring(store, notifier).await;
                record_run(&logs, "Score Refresh", started_at, summary).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!("Scheduled score refresh daily at {}:00 UTC", hour);

        Ok(())
    }

    pub async fn get_execution_logs(&self) -> Vec<JobExecutionLog> {
        self.execution_logs.read().await.clone()
    }

    /// Manual trigger used by operational tooling and tests.
    pub async fn run_job_now(&self, job_name: &str) -> JobResult<RunSummary> {
        let store = self.store.clone();
        let notifier = self.notifier.clone();

        let summary = match job_name {
            "sla_check" => runner::run_sla_scan(store, notifier, &self.automation).await,
            "drip_runner" => runner::run_drip_steps(store, notifier).await,
            "lead_nurturing" => runner::run_lead_nurturing(store, notifier, &self.automation).await,
            "deal_follow_up" => runner::run_deal_follow_ups(store, notifier, &self.automation).await,
            "follow_up_scan" => runner::run_follow_up_rules(store, notifier).await,
            "score_refresh" => runner::run_daily_scoring(store, notifier).await,
            _ => return Err(JobError::ConfigError(format!("Unknown job: {}", job_name))),
        };

        if !summary.errors.is_empty() {
            error!(job = job_name, errors = summary.errors.len(), "manual job run had errors");
        }

        Ok(summary)
    }
}
