//! Daily schedule: fire the run entry point at a local time of day.

use std::future::Future;

use chrono::{DateTime, Local, NaiveTime, TimeZone};
use sift_config::{ConfigError, ScheduleConfig};
use tokio_util::sync::CancellationToken;

/// Days searched for a valid wall-clock instant before giving up.
const DST_LOOKAHEAD_DAYS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

impl DailySchedule {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `hour:minute` is not a time
    /// of day.
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { time })
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "schedule".into(),
                reason: format!("{hour:02}:{minute:02} is not a time of day"),
            })
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] if the schedule is disabled and
    /// [`ConfigError::InvalidValue`] for a bad time.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        if !config.enabled {
            return Err(ConfigError::NotConfigured {
                section: "schedule".into(),
            });
        }
        Self::new(config.hour, config.minute)
    }

    /// First instant strictly after `now` whose wall-clock time matches.
    ///
    /// Days where the time falls in a DST gap are skipped; an ambiguous time
    /// resolves to its earlier instant.
    #[must_use]
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let zone = now.timezone();
        let mut date = now.date_naive();
        for _ in 0..DST_LOOKAHEAD_DAYS {
            if let Some(at) = date.and_time(self.time).and_local_timezone(zone.clone()).earliest() {
                if at > *now {
                    return Some(at);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Sleep until each scheduled instant and await `job`, until `cancel`
    /// fires. A job in progress is left to finish its own cancellation.
    pub async fn run_forever<F, Fut>(&self, cancel: &CancellationToken, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        while !cancel.is_cancelled() {
            let now = Local::now();
            let Some(next) = self.next_after(&now) else {
                tracing::error!(time = %self.time, "no upcoming instant for the schedule");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next = %next.format("%Y-%m-%d %H:%M"), "next scheduled run");

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(wait) => {}
            }
            job().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn later_today() {
        let schedule = DailySchedule::new(8, 30).unwrap();
        assert_eq!(
            schedule.next_after(&at(2026, 3, 1, 7, 0)),
            Some(at(2026, 3, 1, 8, 30))
        );
    }

    #[test]
    fn passed_or_exact_rolls_to_tomorrow() {
        let schedule = DailySchedule::new(8, 30).unwrap();
        assert_eq!(
            schedule.next_after(&at(2026, 3, 1, 8, 30)),
            Some(at(2026, 3, 2, 8, 30))
        );
        assert_eq!(
            schedule.next_after(&at(2026, 12, 31, 23, 0)),
            Some(at(2027, 1, 1, 8, 30))
        );
    }

    #[test]
    fn rejects_bad_times_and_disabled_schedule() {
        assert!(DailySchedule::new(24, 0).is_err());
        assert!(DailySchedule::new(8, 60).is_err());

        let disabled = ScheduleConfig {
            enabled: false,
            ..ScheduleConfig::default()
        };
        assert!(matches!(
            DailySchedule::from_config(&disabled),
            Err(ConfigError::NotConfigured { .. })
        ));
        assert!(DailySchedule::from_config(&ScheduleConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn cancelled_daemon_never_runs_the_job() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runs = AtomicUsize::new(0);
        DailySchedule::new(0, 0)
            .unwrap()
            .run_forever(&cancel, || {
                runs.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
