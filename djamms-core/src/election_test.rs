#[cfg(test)]
mod tests {
    use crate::election::{ElectionEngine, ElectionVerdict};
    use crate::types::{Grant, Lease, LeaseStatus};

    fn lease(device_id: &str, ttl: u64, now: u64) -> Lease {
        Lease::new(
            "l_1".to_string(),
            "v1".to_string(),
            device_id.to_string(),
            ttl,
            now,
        )
    }

    #[test]
    fn unclaimed_venue_is_grantable() {
        let verdict = ElectionEngine::decide(None, "d1", 1000);
        assert_eq!(
            verdict,
            ElectionVerdict::Grantable { grant: Grant::Fresh }
        );
    }

    #[test]
    fn live_lease_blocks_other_devices() {
        let held = lease("d1", 15_000, 1000);
        let verdict = ElectionEngine::decide(Some(&held), "d2", 5000);
        assert_eq!(
            verdict,
            ElectionVerdict::Denied {
                holder_device: "d1".to_string(),
                heartbeat_at: 1000,
            }
        );
    }

    #[test]
    fn live_lease_reconfirms_for_its_holder() {
        let held = lease("d1", 15_000, 1000);
        let verdict = ElectionEngine::decide(Some(&held), "d1", 5000);
        assert_eq!(
            verdict,
            ElectionVerdict::Grantable {
                grant: Grant::Reconfirmed
            }
        );
    }

    #[test]
    fn expired_lease_is_reclaimable() {
        // Claimed at t=1000 with ttl 15s -> reclaimable from t=16000
        let held = lease("d1", 15_000, 1000);
        let verdict = ElectionEngine::decide(Some(&held), "d2", 16_000);
        assert_eq!(
            verdict,
            ElectionVerdict::Grantable { grant: Grant::Fresh }
        );
    }

    #[test]
    fn offline_lease_is_reclaimable_before_expiry() {
        let mut held = lease("d1", 15_000, 1000);
        held.status = LeaseStatus::Offline;
        let verdict = ElectionEngine::decide(Some(&held), "d3", 2000);
        assert_eq!(
            verdict,
            ElectionVerdict::Grantable { grant: Grant::Fresh }
        );
    }
}
