//! Decides whether an outage was already communicated to a subscriber.

use crate::entity::OutageRecord;
use crate::entity::Subscriber;
use crate::entity::Watermark;

/// True iff the subscriber's watermark equals the outage's start, end and
/// comment. A changed comment on an otherwise unchanged outage is a new
/// notification.
pub fn already_sent(subscriber: &Subscriber, outage: &OutageRecord) -> bool {
    subscriber.watermark.as_ref().is_some_and(|w| {
        w.start == outage.start_timestamp
            && w.end == outage.end_timestamp
            && w.comment == outage.comment
    })
}

/// The watermark a subscriber carries after `outage` was delivered.
pub fn next_watermark(outage: &OutageRecord) -> Watermark {
    Watermark::of(outage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outage() -> OutageRecord {
        OutageRecord {
            id: 1,
            start_timestamp: "2024-11-28T06:47:00+00:00".to_string(),
            end_timestamp: "2024-11-28T10:00:00+00:00".to_string(),
            city_name: "Львів".to_string(),
            street_id: 12783,
            street_name: "Городоцька".to_string(),
            affected_buildings: "271, 273, 279".to_string(),
            comment: "ГПВ".to_string(),
        }
    }

    #[test]
    fn test_unset_watermark_is_never_sent() {
        let sub = Subscriber::new(1, 12783, "Городоцька", "271");
        assert!(!already_sent(&sub, &outage()));
    }

    #[test]
    fn test_exact_watermark_is_sent() {
        let o = outage();
        let sub = Subscriber::new(1, 12783, "Городоцька", "271").with_watermark(next_watermark(&o));
        assert!(already_sent(&sub, &o));
    }

    #[test]
    fn test_any_field_change_requires_resend() {
        let o = outage();
        let sub = Subscriber::new(1, 12783, "Городоцька", "271").with_watermark(next_watermark(&o));

        let mut changed = o.clone();
        changed.start_timestamp = "2024-11-28T06:48:00+00:00".to_string();
        assert!(!already_sent(&sub, &changed));

        let mut changed = o.clone();
        changed.end_timestamp = "2024-11-28T11:00:00+00:00".to_string();
        assert!(!already_sent(&sub, &changed));

        let mut changed = o.clone();
        changed.comment = "АВР".to_string();
        assert!(!already_sent(&sub, &changed));

        // Fields outside the watermark do not matter.
        let mut changed = o;
        changed.affected_buildings = "271".to_string();
        changed.id = 99;
        assert!(already_sent(&sub, &changed));
    }
}
