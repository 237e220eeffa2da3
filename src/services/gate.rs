use chrono::{DateTime, Duration, Utc};

use crate::models::intervention::{Intervention, LinkKind};

/// Tracking links stay valid for 24 hours after issuance.
const TRACK_TTL_HOURS: i64 = 24;

/// Diagnostic links stay valid for 2 hours after issuance.
const DIAG_TTL_HOURS: i64 = 2;

/// The two expiry horizons of a link, fixed at issuance and immutable after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizons {
    pub track_expires_at: DateTime<Utc>,
    pub diag_expires_at: DateTime<Utc>,
}

/// Compute both horizons for a link issued at `now`. Both are always
/// computed, whichever single link kind was requested, so one record can
/// later serve either experience.
pub fn horizons(now: DateTime<Utc>) -> Horizons {
    Horizons {
        track_expires_at: now + Duration::hours(TRACK_TTL_HOURS),
        diag_expires_at: now + Duration::hours(DIAG_TTL_HOURS),
    }
}

/// Why the gate refused access. The two outcomes render distinct client
/// messages, and a missing record is never reported as expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("invalid link: no intervention for this token")]
    NotFound,

    #[error("link expired")]
    Expired,
}

/// Existence-and-expiry check performed before granting a client-facing
/// experience. Pure read: possession of the token is the only authorization,
/// and each horizon is checked independently per requested kind.
pub fn check(
    record: Option<&Intervention>,
    kind: LinkKind,
    now: DateTime<Utc>,
) -> Result<&Intervention, GateError> {
    let intervention = record.ok_or(GateError::NotFound)?;

    let expires_at = match kind {
        LinkKind::Tracking => intervention.track_expires_at,
        LinkKind::Diagnostic => intervention.diag_expires_at,
    };

    if expires_at < now {
        return Err(GateError::Expired);
    }

    Ok(intervention)
}

/// The horizon relevant to a requested experience.
pub fn expiry_for(intervention: &Intervention, kind: LinkKind) -> DateTime<Utc> {
    match kind {
        LinkKind::Tracking => intervention.track_expires_at,
        LinkKind::Diagnostic => intervention.diag_expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intervention::InterventionStatus;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn intervention_issued_at(now: DateTime<Utc>) -> Intervention {
        let h = horizons(now);
        Intervention {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            client_name: "M. Jean Dupont".to_string(),
            location: "À préciser".to_string(),
            intervention_type: "Diagnostic".to_string(),
            status: InterventionStatus::Ongoing,
            diag_photos: None,
            track_expires_at: h.track_expires_at,
            diag_expires_at: h.diag_expires_at,
            scheduled_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn diag_horizon_always_precedes_track_horizon() {
        let h = horizons(t0());
        assert!(h.diag_expires_at < h.track_expires_at);
        assert_eq!(h.track_expires_at - t0(), Duration::hours(24));
        assert_eq!(h.diag_expires_at - t0(), Duration::hours(2));
    }

    #[test]
    fn missing_record_is_not_found_never_expired() {
        assert_eq!(
            check(None, LinkKind::Tracking, t0()),
            Err(GateError::NotFound)
        );
        assert_eq!(
            check(None, LinkKind::Diagnostic, t0() + Duration::days(365)),
            Err(GateError::NotFound)
        );
    }

    #[test]
    fn fresh_link_admits_both_kinds() {
        let rec = intervention_issued_at(t0());
        assert!(check(Some(&rec), LinkKind::Tracking, t0()).is_ok());
        assert!(check(Some(&rec), LinkKind::Diagnostic, t0()).is_ok());
    }

    #[test]
    fn horizons_are_checked_independently_per_kind() {
        let rec = intervention_issued_at(t0());

        // 1h59 after issuance: both still open.
        let just_before = t0() + Duration::hours(1) + Duration::minutes(59);
        assert!(check(Some(&rec), LinkKind::Diagnostic, just_before).is_ok());
        assert!(check(Some(&rec), LinkKind::Tracking, just_before).is_ok());

        // 2h01 after issuance: diagnostic gone, tracking still open.
        let just_after = t0() + Duration::hours(2) + Duration::minutes(1);
        assert_eq!(
            check(Some(&rec), LinkKind::Diagnostic, just_after),
            Err(GateError::Expired)
        );
        assert!(check(Some(&rec), LinkKind::Tracking, just_after).is_ok());
    }

    #[test]
    fn tracking_expires_after_its_own_horizon() {
        let rec = intervention_issued_at(t0());
        let past_track = t0() + Duration::hours(25);
        assert_eq!(
            check(Some(&rec), LinkKind::Tracking, past_track),
            Err(GateError::Expired)
        );
    }

    #[test]
    fn repeated_checks_are_side_effect_free() {
        let rec = intervention_issued_at(t0());
        let before = rec.clone();
        let _ = check(Some(&rec), LinkKind::Tracking, t0());
        let _ = check(Some(&rec), LinkKind::Tracking, t0());
        assert_eq!(rec.updated_at, before.updated_at);
        assert_eq!(rec.diag_photos, before.diag_photos);
    }

    #[test]
    fn expiry_for_picks_the_matching_horizon() {
        let rec = intervention_issued_at(t0());
        assert_eq!(expiry_for(&rec, LinkKind::Tracking), rec.track_expires_at);
        assert_eq!(expiry_for(&rec, LinkKind::Diagnostic), rec.diag_expires_at);
    }
}
