#[cfg(test)]
mod tests {
    use crate::config::CoordinatorConfig;
    use crate::session::{DeviceSession, SessionState};
    use crate::types::{
        DenyReason, DeviceIdentity, Grant, Lease, MasterDecision, RenewOutcome,
    };

    fn session() -> DeviceSession {
        DeviceSession::new("v1", DeviceIdentity::new("d1"), CoordinatorConfig::default())
    }

    fn granted() -> MasterDecision {
        MasterDecision::granted(
            Lease::new(
                "l_1".to_string(),
                "v1".to_string(),
                "d1".to_string(),
                15_000,
                1000,
            ),
            Grant::Fresh,
        )
    }

    #[test]
    fn starts_uninitialized() {
        assert_eq!(session().state(), SessionState::Uninitialized);
    }

    #[test]
    fn granted_decision_promotes_to_master() {
        let mut s = session();
        s.begin_acquire();
        assert_eq!(s.state(), SessionState::Acquiring);
        assert_eq!(s.on_decision(&granted()), SessionState::Master);
    }

    #[test]
    fn master_active_denial_lands_in_observer() {
        let mut s = session();
        s.begin_acquire();
        let denied = MasterDecision::denied(DenyReason::MasterActive {
            holder_device: "d2".to_string(),
            heartbeat_at: 1000,
        });
        assert_eq!(s.on_decision(&denied), SessionState::Observer);
    }

    #[test]
    fn network_error_keeps_acquiring() {
        let mut s = session();
        s.begin_acquire();
        let denied = MasterDecision::denied(DenyReason::NetworkError {
            detail: "timed out".to_string(),
        });
        // Transport failure is retry limbo, never a demotion
        assert_eq!(s.on_decision(&denied), SessionState::Acquiring);
    }

    #[test]
    fn renewal_rejection_demotes_immediately() {
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());
        let outcome = RenewOutcome::LostToPeer {
            holder_device: "d2".to_string(),
        };
        assert_eq!(s.on_renew_outcome(&outcome), SessionState::Observer);
    }

    #[test]
    fn missing_lease_record_demotes() {
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());
        assert_eq!(s.on_renew_outcome(&RenewOutcome::NoLease), SessionState::Observer);
    }

    #[test]
    fn transient_renew_errors_respect_the_missed_beat_budget() {
        // Default config: 15s ttl / 5s beats -> 3 misses spend the budget
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());

        assert_eq!(s.on_renew_error(), SessionState::Master);
        assert_eq!(s.on_renew_error(), SessionState::Master);
        assert_eq!(s.on_renew_error(), SessionState::Observer);
    }

    #[test]
    fn successful_renewal_resets_the_miss_count() {
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());

        s.on_renew_error();
        s.on_renew_error();
        s.on_renew_outcome(&RenewOutcome::Renewed { expires_at: 20_000 });

        assert_eq!(s.on_renew_error(), SessionState::Master);
        assert_eq!(s.on_renew_error(), SessionState::Master);
        assert_eq!(s.on_renew_error(), SessionState::Observer);
    }

    #[test]
    fn authority_lost_demotes_a_master() {
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());
        assert_eq!(s.on_authority_lost(), SessionState::Observer);
    }

    #[test]
    fn release_returns_to_observer() {
        let mut s = session();
        s.begin_acquire();
        s.on_decision(&granted());
        assert_eq!(s.on_released(), SessionState::Observer);
    }

    #[test]
    fn observer_may_retry_acquisition() {
        let mut s = session();
        s.begin_acquire();
        let denied = MasterDecision::denied(DenyReason::MasterActive {
            holder_device: "d2".to_string(),
            heartbeat_at: 1000,
        });
        s.on_decision(&denied);
        assert_eq!(s.begin_acquire(), SessionState::Acquiring);
    }

    #[test]
    fn renew_outcomes_are_ignored_outside_master() {
        let mut s = session();
        s.begin_acquire();
        let outcome = RenewOutcome::LostToPeer {
            holder_device: "d2".to_string(),
        };
        // A late callback from a previous life must not flip the state
        assert_eq!(s.on_renew_outcome(&outcome), SessionState::Acquiring);
        assert_eq!(s.on_renew_error(), SessionState::Acquiring);
    }
}
