//! Timer-driven status progression for demo transfers.
//!
//! A pending transfer picks up a CCTP id, then a burn hash, then completes,
//! purely from its age. Nothing here talks to a chain.

use chrono::{DateTime, Utc};

use crate::core::config::DemoConfig;
use crate::core::domain::{generate_cctp_id, generate_tx_hash};
use crate::core::{Transfer, TransferPatch, TransferStatus};

/// Next demo step for `transfer` at `now`, if any. At most one step per call.
pub fn demo_progress(
    transfer: &Transfer,
    now: DateTime<Utc>,
    demo: &DemoConfig,
) -> Option<TransferPatch> {
    if !demo.enabled || transfer.status != TransferStatus::Pending {
        return None;
    }

    let age_secs = (now - transfer.created_at).num_milliseconds() as f64 / 1000.0;

    if age_secs > demo.complete_after_secs as f64 {
        Some(TransferPatch {
            status: Some(TransferStatus::Completed),
            destination_tx_hash: Some(generate_tx_hash()),
            completed_at: Some(now),
            ..Default::default()
        })
    } else if age_secs > demo.burn_after_secs as f64 && transfer.tx_hash.is_none() {
        Some(TransferPatch { tx_hash: Some(generate_tx_hash()), ..Default::default() })
    } else if age_secs > demo.cctp_id_after_secs as f64 && transfer.cctp_transfer_id.is_none() {
        Some(TransferPatch { cctp_transfer_id: Some(generate_cctp_id()), ..Default::default() })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransferIntent;
    use chrono::Duration;
    use test_case::test_case;

    fn aged(secs: i64) -> (Transfer, DateTime<Utc>) {
        let now = Utc::now();
        let t = Transfer::new(
            "demo_1_a".into(),
            "0xa".into(),
            "0xb".into(),
            10.0,
            "ethereum".into(),
            "base".into(),
            TransferIntent::Standard,
            now - Duration::seconds(secs),
        );
        (t, now)
    }

    #[test_case(0 ; "fresh")]
    #[test_case(10 ; "exactly ten seconds")]
    fn test_young_transfer_does_not_move(secs: i64) {
        let (t, now) = aged(secs);
        assert!(demo_progress(&t, now, &DemoConfig::default()).is_none());
    }

    #[test]
    fn test_steps_in_order() {
        let demo = DemoConfig::default();

        let (t, now) = aged(11);
        let patch = demo_progress(&t, now, &demo).unwrap();
        assert!(patch.cctp_transfer_id.unwrap().starts_with("cctp_"));
        assert!(patch.status.is_none());

        let (t, now) = aged(21);
        let patch = demo_progress(&t, now, &demo).unwrap();
        assert_eq!(patch.tx_hash.unwrap().len(), 66);
        assert!(patch.cctp_transfer_id.is_none());

        let (t, now) = aged(31);
        let patch = demo_progress(&t, now, &demo).unwrap();
        assert_eq!(patch.status, Some(TransferStatus::Completed));
        assert!(patch.destination_tx_hash.is_some());
        assert_eq!(patch.completed_at, Some(now));
    }

    #[test]
    fn test_existing_fields_skip_step() {
        let demo = DemoConfig::default();
        let (mut t, now) = aged(25);
        t.tx_hash = Some("0xburn".into());
        t.cctp_transfer_id = Some("cctp_x".into());
        assert!(demo_progress(&t, now, &demo).is_none());

        t.tx_hash = Some("0xburn".into());
        t.cctp_transfer_id = None;
        assert!(demo_progress(&t, now, &demo).unwrap().cctp_transfer_id.is_some());
    }

    #[test]
    fn test_only_pending_and_enabled() {
        let (mut t, now) = aged(60);
        t.status = TransferStatus::Failed;
        assert!(demo_progress(&t, now, &DemoConfig::default()).is_none());

        let (t, now) = aged(60);
        let disabled = DemoConfig { enabled: false, ..Default::default() };
        assert!(demo_progress(&t, now, &disabled).is_none());
    }
}
