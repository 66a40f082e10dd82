use std::time::Duration;

use tokio::time::Instant;

/// Handle of the next scheduled poll.
///
/// At most one poll is ever armed: scheduling replaces the previous deadline,
/// and manual triggers cancel it before running a cycle.
#[derive(Debug, Clone)]
pub struct PollTimer {
    period: Duration,
    due: Option<Instant>,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, due: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arms the timer one period from now.
    pub fn schedule(&mut self) {
        self.due = Some(Instant::now() + self.period);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.due
    }
}

/// Completes at `due`; never completes for a cancelled timer.
pub async fn sleep_until_due(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_replaces_and_cancel_clears() {
        let mut timer = PollTimer::new(Duration::from_secs(5));
        assert!(!timer.is_armed());

        timer.schedule();
        let first = timer.due_at().unwrap();
        timer.schedule();
        assert!(timer.due_at().unwrap() >= first);

        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(timer.due_at(), None);
    }
}
