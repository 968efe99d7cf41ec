//! Bounded-retry reconnection state machine.
//!
//! The policy is a fixed delay between attempts with a hard attempt cap. No
//! exponential backoff, and no distinction between a transient network error
//! and a broadcast that has ended: an ended broadcast simply exhausts its
//! attempts and is evicted.

use std::time::Duration;

use tap_types::config::ReconnectConfig;
use tap_types::subscription::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(cfg: &ReconnectConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            delay: Duration::from_millis(cfg.delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Connected,
    Reconnecting { attempt: u32 },
    Exhausted,
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait `delay`, then run handshake number `attempt`.
    Attempt { attempt: u32, delay: Duration },
    /// Terminal: evict the subscription.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ReconnectSupervisor {
    policy: ReconnectPolicy,
    state: SupervisorState,
    failed: u32,
}

impl ReconnectSupervisor {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: SupervisorState::Connected,
            failed: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Failed attempts since the last successful (re)connect.
    pub fn failed_attempts(&self) -> u32 {
        self.failed
    }

    /// Caller-facing view. `Exhausted` never reaches callers because the
    /// entry is gone by then.
    pub fn connection_state(&self) -> ConnectionState {
        match self.state {
            SupervisorState::Reconnecting { attempt } => ConnectionState::Reconnecting { attempt },
            SupervisorState::Connected | SupervisorState::Exhausted => ConnectionState::Connected,
        }
    }

    /// A disconnect or error signal arrived. Only the first signal of an
    /// outage starts a cycle; later ones return `None` so that at most one
    /// attempt is ever in flight.
    pub fn on_signal(&mut self) -> Option<Step> {
        match self.state {
            SupervisorState::Connected if self.policy.max_attempts == 0 => {
                self.state = SupervisorState::Exhausted;
                Some(Step::Exhausted { attempts: 0 })
            }
            SupervisorState::Connected => {
                self.state = SupervisorState::Reconnecting { attempt: 1 };
                Some(Step::Attempt {
                    attempt: 1,
                    delay: Duration::ZERO,
                })
            }
            SupervisorState::Reconnecting { .. } | SupervisorState::Exhausted => None,
        }
    }

    pub fn on_success(&mut self) {
        if self.state != SupervisorState::Exhausted {
            self.state = SupervisorState::Connected;
            self.failed = 0;
        }
    }

    /// The in-flight handshake failed.
    pub fn on_failure(&mut self) -> Step {
        let attempt = match self.state {
            SupervisorState::Reconnecting { attempt } => attempt,
            SupervisorState::Exhausted => return Step::Exhausted { attempts: self.failed },
            // A failure without a cycle in progress counts as the first one.
            SupervisorState::Connected => 1,
        };
        self.failed = self.failed.saturating_add(1);

        let next = attempt + 1;
        if next <= self.policy.max_attempts {
            self.state = SupervisorState::Reconnecting { attempt: next };
            Step::Attempt {
                attempt: next,
                delay: self.policy.delay,
            }
        } else {
            self.state = SupervisorState::Exhausted;
            Step::Exhausted {
                attempts: self.failed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn first_attempt_is_immediate() {
        let mut sup = ReconnectSupervisor::new(policy(5));
        assert_eq!(
            sup.on_signal(),
            Some(Step::Attempt {
                attempt: 1,
                delay: Duration::ZERO
            })
        );
        assert_eq!(sup.state(), SupervisorState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn second_signal_while_reconnecting_is_ignored() {
        let mut sup = ReconnectSupervisor::new(policy(5));
        sup.on_signal();
        assert_eq!(sup.on_signal(), None);
        assert_eq!(sup.state(), SupervisorState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn exhausts_after_max_failures_with_fixed_delay() {
        let mut sup = ReconnectSupervisor::new(policy(5));
        sup.on_signal();
        for expected in 2..=5 {
            assert_eq!(
                sup.on_failure(),
                Step::Attempt {
                    attempt: expected,
                    delay: Duration::from_secs(5)
                }
            );
        }
        assert_eq!(sup.on_failure(), Step::Exhausted { attempts: 5 });
        assert_eq!(sup.state(), SupervisorState::Exhausted);
        assert_eq!(sup.on_signal(), None);
    }

    #[test]
    fn success_resets_counter() {
        let mut sup = ReconnectSupervisor::new(policy(5));
        sup.on_signal();
        sup.on_failure();
        assert_eq!(sup.failed_attempts(), 1);
        assert_eq!(
            sup.connection_state(),
            ConnectionState::Reconnecting { attempt: 2 }
        );

        sup.on_success();
        assert_eq!(sup.failed_attempts(), 0);
        assert_eq!(sup.state(), SupervisorState::Connected);

        // A fresh outage starts again from attempt 1.
        assert!(matches!(sup.on_signal(), Some(Step::Attempt { attempt: 1, .. })));
    }

    #[test]
    fn zero_attempts_evicts_immediately() {
        let mut sup = ReconnectSupervisor::new(policy(0));
        assert_eq!(sup.on_signal(), Some(Step::Exhausted { attempts: 0 }));
    }
}
