//! Daily send-time evaluation and the scheduler loop.
//!
//! Each configured `HH:MM` becomes a cron schedule evaluated in the display
//! timezone. The loop ticks at a fixed interval, sends one report when any
//! slot is due, and exits on the shutdown signal.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{parse_send_time, ConfigError};
use crate::delivery::ReportJob;
use crate::transport::ChatTransport;

/// One daily send time.
#[derive(Debug, Clone)]
pub struct SendSlot {
    /// Normalised `HH:MM` label.
    pub label: String,
    schedule: cron::Schedule,
}

/// All send times in one timezone.
#[derive(Debug, Clone)]
pub struct SendSchedule {
    slots: Vec<SendSlot>,
    tz: Tz,
}

impl SendSchedule {
    /// Build a schedule from `HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSendTime`] for a malformed entry and
    /// [`ConfigError::NoSendTimes`] when the list is empty.
    pub fn parse(times: &[String], tz: Tz) -> Result<Self, ConfigError> {
        if times.is_empty() {
            return Err(ConfigError::NoSendTimes);
        }
        let slots = times
            .iter()
            .map(|raw| {
                let (hour, minute) = parse_send_time(raw)?;
                let schedule = cron::Schedule::from_str(&format!("0 {minute} {hour} * * *"))
                    .map_err(|_| ConfigError::InvalidSendTime(raw.clone()))?;
                Ok(SendSlot {
                    label: format!("{hour:02}:{minute:02}"),
                    schedule,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { slots, tz })
    }

    /// Configured slots in declaration order.
    pub fn slots(&self) -> &[SendSlot] {
        &self.slots
    }

    /// Earliest trigger strictly after `after`, across all slots.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.tz);
        self.slots
            .iter()
            .filter_map(|slot| slot.schedule.after(&local).next())
            .map(|next| next.with_timezone(&Utc))
            .min()
    }
}

/// Tracks the last run of each slot.
#[derive(Debug)]
pub struct SchedulerState {
    started_at: DateTime<Utc>,
    last_run: HashMap<String, DateTime<Utc>>,
}

impl SchedulerState {
    /// State for a scheduler started at `at`; slots before `at` never fire.
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            last_run: HashMap::new(),
        }
    }

    /// Record that `label` ran at `at`.
    pub fn record_run(&mut self, label: &str, at: DateTime<Utc>) {
        self.last_run.insert(label.to_owned(), at);
    }

    /// Last run of `label`, or the start instant if it never ran.
    pub fn last_run_for(&self, label: &str) -> DateTime<Utc> {
        self.last_run.get(label).copied().unwrap_or(self.started_at)
    }
}

/// Slots whose next trigger after their last run is at or before `now`.
pub fn due_slots<'a>(
    schedule: &'a SendSchedule,
    state: &SchedulerState,
    now: DateTime<Utc>,
) -> Vec<&'a SendSlot> {
    schedule
        .slots
        .iter()
        .filter(|slot| {
            let after = state.last_run_for(&slot.label).with_timezone(&schedule.tz);
            slot.schedule
                .after(&after)
                .take(1)
                .any(|next| next.with_timezone(&Utc) <= now)
        })
        .collect()
}

/// Dependencies of the scheduler loop.
pub struct SchedulerDeps {
    /// Report producer.
    pub job: Arc<ReportJob>,
    /// Outbound transport.
    pub transport: Arc<dyn ChatTransport>,
    /// Chats receiving each report.
    pub destinations: Vec<i64>,
    /// Send times.
    pub schedule: SendSchedule,
    /// Tick interval.
    pub tick: Duration,
}

/// Run the scheduler until the shutdown signal fires or its sender drops.
///
/// Slots that fall due on the same tick collapse into a single send.
pub async fn run_scheduler(deps: SchedulerDeps, mut shutdown_rx: watch::Receiver<bool>) {
    let tick = deps.tick.max(Duration::from_secs(1));
    let mut state = SchedulerState::starting_at(Utc::now());
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let slots: Vec<&str> = deps.schedule.slots().iter().map(|s| s.label.as_str()).collect();
    info!(
        slots = ?slots,
        tick_secs = tick.as_secs(),
        next = ?deps.schedule.next_after(Utc::now()),
        "scheduler started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                let due = due_slots(&deps.schedule, &state, now);
                if due.is_empty() {
                    continue;
                }

                let labels: Vec<String> = due.iter().map(|s| s.label.clone()).collect();
                for label in &labels {
                    state.record_run(label, now);
                }
                if labels.len() > 1 {
                    warn!(slots = ?labels, "several slots due at once, sending one report");
                }
                debug!(slots = ?labels, "send slot due");

                deps.job.run(deps.transport.as_ref(), &deps.destinations).await;
                info!(next = ?deps.schedule.next_after(Utc::now()), "next report scheduled");
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }

    info!("scheduler stopped");
}
