//! Property-Based Tests for Quota Enforcement
//!
//! Random call sequences, users and clock advances against the invariants
//! the enforcer promises:
//!
//! - **Ceilings**: a window never admits more than its ceiling
//! - **Rejections**: a rejected call leaves all counters untouched
//! - **Remaining**: the reported allowance is the minimum of both windows
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib quota::proptests
//! ```

use proptest::prelude::*;
use std::time::Duration;

use crate::quota::clock::ManualClock;
use crate::quota::enforcer::QuotaEnforcer;
use crate::quota::limits::QuotaLimits;

// Helper: one step of a simulated workload
#[derive(Debug, Clone)]
enum Step {
    Call { user: usize },
    Advance { secs: u64 },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0usize..3).prop_map(|user| Step::Call { user }),
        1 => (1u64..90).prop_map(|secs| Step::Advance { secs }),
    ]
}

fn enforcer() -> (QuotaEnforcer<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (QuotaEnforcer::with_clock(clock.clone(), 16), clock)
}

const USERS: [&str; 3] = ["u1", "u2", "u3"];

proptest! {
    /// Exactly min(N, M) of N same-window calls are admitted
    #[test]
    fn prop_exactly_ceiling_calls_admitted(per_minute in 1u32..20, calls in 1u32..60) {
        let (enforcer, _clock) = enforcer();
        let limits = QuotaLimits::new(per_minute, 10_000).unwrap();

        let allowed = (0..calls)
            .filter(|_| enforcer.check_and_consume("u1", "compose", &limits).allowed)
            .count() as u32;

        prop_assert_eq!(allowed, calls.min(per_minute));
    }

    /// Counters never exceed their ceilings, rejections never mutate, and
    /// remaining always equals the smaller window allowance
    #[test]
    fn prop_invariants_hold_across_workloads(
        per_minute in 1u32..6,
        per_day in 1u32..15,
        steps in prop::collection::vec(arb_step(), 1..120),
    ) {
        let (enforcer, clock) = enforcer();
        let limits = QuotaLimits::new(per_minute, per_day).unwrap();

        for step in steps {
            match step {
                Step::Advance { secs } => clock.advance(Duration::from_secs(secs)),
                Step::Call { user } => {
                    let user = USERS[user];
                    let before = enforcer.usage(user, "compose", &limits);
                    let decision = enforcer.check_and_consume(user, "compose", &limits);
                    let after = enforcer.usage(user, "compose", &limits);

                    prop_assert!(decision.retry_after_secs >= 1);

                    if decision.allowed {
                        prop_assert_eq!(after.minute.count, before.minute.count + 1);
                        prop_assert_eq!(after.day.count, before.day.count + 1);
                        prop_assert_eq!(decision.remaining, after.remaining);
                    } else {
                        prop_assert_eq!(after, before);
                        prop_assert_eq!(decision.remaining, 0);
                    }

                    prop_assert!(after.minute.count <= per_minute);
                    prop_assert!(after.day.count <= per_day);
                    prop_assert_eq!(
                        after.remaining,
                        after.minute.remaining.min(after.day.remaining)
                    );
                }
            }
        }
    }

    /// Exhausting one user never changes another user's allowance
    #[test]
    fn prop_users_isolated(per_minute in 1u32..10, extra in 0u32..10) {
        let (enforcer, _clock) = enforcer();
        let limits = QuotaLimits::new(per_minute, 1_000).unwrap();

        let untouched = enforcer.usage("u2", "compose", &limits);
        for _ in 0..(per_minute + extra) {
            enforcer.check_and_consume("u1", "compose", &limits);
        }

        prop_assert_eq!(enforcer.usage("u2", "compose", &limits), untouched);
        prop_assert!(enforcer.check_and_consume("u2", "compose", &limits).allowed);
    }

    /// A call after the minute window closes always sees a fresh minute counter
    #[test]
    fn prop_expired_window_is_fresh(per_minute in 1u32..10, wait in 60u64..600) {
        let (enforcer, clock) = enforcer();
        let limits = QuotaLimits::new(per_minute, 10_000).unwrap();

        for _ in 0..per_minute {
            enforcer.check_and_consume("u1", "compose", &limits);
        }
        clock.advance(Duration::from_secs(wait));

        let decision = enforcer.check_and_consume("u1", "compose", &limits);
        prop_assert!(decision.allowed);
        prop_assert_eq!(decision.remaining, per_minute - 1);
        prop_assert_eq!(enforcer.usage("u1", "compose", &limits).minute.count, 1);
    }
}
