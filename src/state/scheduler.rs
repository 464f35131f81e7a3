use esports_api::ApiError;
use log::debug;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;

/// How long scheduled and manual cycles are skipped after the upstream
/// reports a rate limit.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// Identifies one poll cycle. Only the most recently issued ticket may settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket(u64);

/// How a cycle ended, as far as the UI is concerned.
#[derive(Debug)]
pub enum Settled<T> {
    Fresh(T),
    RateLimited { until: Instant },
    Failed(ApiError),
    /// Superseded by a newer cycle; must not be rendered.
    Stale,
}

/// Per-session cycle bookkeeping: the current generation, the abort handle of
/// the in-flight fetch and the rate-limit window.
#[derive(Debug, Default)]
pub struct CycleGate {
    generation: u64,
    active: Option<CycleTicket>,
    in_flight: Option<AbortHandle>,
    cooldown_until: Option<Instant>,
}

impl CycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Issue a ticket for a new cycle, cancelling whatever is still in flight.
    /// Returns the remaining cooldown instead while rate limited.
    pub fn begin(&mut self, now: Instant) -> Result<CycleTicket, Duration> {
        if let Some(remaining) = self.cooldown_remaining(now) {
            return Err(remaining);
        }
        self.cooldown_until = None;
        self.cancel_in_flight();

        self.generation += 1;
        let ticket = CycleTicket(self.generation);
        self.active = Some(ticket);
        Ok(ticket)
    }

    /// Remember the task serving `ticket` so the next cycle can abort it.
    pub fn track(&mut self, ticket: CycleTicket, handle: AbortHandle) {
        if self.is_current(ticket) {
            self.in_flight = Some(handle);
        } else {
            handle.abort();
        }
    }

    pub fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("cancelling superseded refresh cycle");
            }
            handle.abort();
        }
        self.active = None;
    }

    pub fn is_current(&self, ticket: CycleTicket) -> bool {
        self.active == Some(ticket)
    }

    pub fn is_fetching(&self) -> bool {
        self.active.is_some()
    }

    /// Classify a finished cycle. A rate limit opens the cooldown window.
    pub fn settle<T>(
        &mut self,
        ticket: CycleTicket,
        outcome: Result<T, ApiError>,
        now: Instant,
    ) -> Settled<T> {
        if !self.is_current(ticket) {
            return Settled::Stale;
        }
        self.active = None;
        self.in_flight = None;

        match outcome {
            Ok(value) => Settled::Fresh(value),
            Err(e) if e.is_rate_limited() => {
                let until = now + RATE_LIMIT_COOLDOWN;
                self.cooldown_until = Some(until);
                Settled::RateLimited { until }
            }
            Err(e) => Settled::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> ApiError {
        ApiError::RateLimited { url: "http://proxy/live".into() }
    }

    fn upstream() -> ApiError {
        ApiError::Upstream {
            url: "http://proxy/live".into(),
            message: "GRID_UNAVAILABLE".into(),
        }
    }

    #[test]
    fn only_latest_ticket_settles() {
        let mut gate = CycleGate::new();
        let now = Instant::now();
        let first = gate.begin(now).unwrap();
        let second = gate.begin(now).unwrap();

        assert!(matches!(gate.settle(first, Ok("first"), now), Settled::Stale));
        assert!(matches!(gate.settle(second, Ok("second"), now), Settled::Fresh("second")));
        assert!(!gate.is_fetching());
    }

    #[test]
    fn a_ticket_settles_once() {
        let mut gate = CycleGate::new();
        let now = Instant::now();
        let ticket = gate.begin(now).unwrap();
        assert!(matches!(gate.settle(ticket, Ok(1), now), Settled::Fresh(1)));
        assert!(matches!(gate.settle(ticket, Ok(2), now), Settled::Stale));
    }

    #[test]
    fn rate_limit_opens_cooldown_that_expires() {
        let mut gate = CycleGate::new();
        let now = Instant::now();
        let ticket = gate.begin(now).unwrap();

        let settled = gate.settle::<()>(ticket, Err(rate_limited()), now);
        assert!(matches!(settled, Settled::RateLimited { until } if until == now + RATE_LIMIT_COOLDOWN));

        let later = now + Duration::from_secs(10);
        assert_eq!(gate.begin(later), Err(Duration::from_secs(50)));

        let after = now + RATE_LIMIT_COOLDOWN;
        assert!(gate.begin(after).is_ok());
        assert_eq!(gate.cooldown_remaining(after), None);
    }

    #[test]
    fn other_failures_do_not_cool_down() {
        let mut gate = CycleGate::new();
        let now = Instant::now();
        let ticket = gate.begin(now).unwrap();
        assert!(matches!(gate.settle::<()>(ticket, Err(upstream()), now), Settled::Failed(_)));
        assert!(gate.begin(now).is_ok());
    }

    #[tokio::test]
    async fn new_cycle_aborts_the_previous_task() {
        let mut gate = CycleGate::new();
        let now = Instant::now();

        let first = gate.begin(now).unwrap();
        let slow = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(30)).await });
        gate.track(first, slow.abort_handle());

        gate.begin(now).unwrap();
        let joined = slow.await;
        assert!(joined.is_err_and(|e| e.is_cancelled()));
    }

    #[tokio::test]
    async fn tracking_a_superseded_ticket_aborts_it() {
        let mut gate = CycleGate::new();
        let now = Instant::now();
        let first = gate.begin(now).unwrap();
        gate.begin(now).unwrap();

        let late = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(30)).await });
        gate.track(first, late.abort_handle());
        assert!(late.await.is_err_and(|e| e.is_cancelled()));
    }
}
