//! Session-level progress derived from the entry registry.

use std::time::Duration;

use fileflow_transfer::EtaBucket;

use crate::registry::EntryRegistry;
use crate::types::{EntryId, EntryStatus, SessionStatus, UploadSession};

/// Point-in-time view of a session, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: u64,
    pub status: SessionStatus,
    pub total_files: usize,
    pub completed_files: usize,
    pub total_size: u64,
    pub uploaded_size: u64,
    /// Overall percent, 0..=100.
    pub percent: u8,
    /// Bytes per second since the session started. `None` before any time
    /// has passed.
    pub throughput: Option<f64>,
    pub eta: Option<EtaBucket>,
    pub elapsed: Duration,
}

/// Bytes accounted for by the participating entries still in the registry.
///
/// Completed entries count in full, uploading ones by their progress, and
/// everything else (pending, failed, removed) counts nothing.
pub fn uploaded_bytes(registry: &EntryRegistry, participants: &[EntryId]) -> u64 {
    participants
        .iter()
        .filter_map(|id| registry.get(*id))
        .map(|entry| match entry.status() {
            EntryStatus::Completed => entry.size(),
            EntryStatus::Uploading => entry.size() * u64::from(entry.progress()) / 100,
            EntryStatus::Pending | EntryStatus::Error => 0,
        })
        .sum()
}

/// Recomputes the session view without touching the registry or session.
///
/// The uploaded byte count never drops below what the session last stored,
/// so removing or failing an in-flight entry does not move the bar backwards.
pub fn aggregate(
    session: &UploadSession,
    registry: &EntryRegistry,
    elapsed: Duration,
) -> SessionSnapshot {
    let total = session.total_size();
    let uploaded = uploaded_bytes(registry, session.participants())
        .max(session.uploaded_size())
        .min(total);

    let percent = if total == 0 {
        0
    } else {
        (uploaded as f64 / total as f64 * 100.0).round() as u8
    };

    let secs = elapsed.as_secs_f64();
    let throughput = (secs > 0.0).then(|| uploaded as f64 / secs);

    let eta = throughput.filter(|rate| *rate > 0.0).map(|rate| {
        let remaining = (total - uploaded) as f64 / rate;
        EtaBucket::from_duration(Duration::from_secs_f64(remaining))
    });

    SessionSnapshot {
        session_id: session.id(),
        status: session.status(),
        total_files: session.total_files(),
        completed_files: session.completed_files(),
        total_size: total,
        uploaded_size: uploaded,
        percent,
        throughput,
        eta,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileEntry;
    use fileflow_transfer::RawFile;

    const MIB: u64 = 1024 * 1024;

    fn setup(sizes: &[u64]) -> (EntryRegistry, UploadSession, Vec<EntryId>) {
        let mut reg = EntryRegistry::new();
        for (i, size) in sizes.iter().enumerate() {
            reg.push(FileEntry::new(RawFile::declared(
                format!("f{i}.bin"),
                *size,
                "application/octet-stream",
            )));
        }
        let pending = reg.pending();
        let session = UploadSession::new(1, &pending);
        let ids = session.participants().to_vec();
        (reg, session, ids)
    }

    #[test]
    fn empty_progress_is_zero() {
        let (reg, session, _) = setup(&[MIB, 2 * MIB, 3 * MIB]);
        let snap = aggregate(&session, &reg, Duration::ZERO);

        assert_eq!(snap.total_size, 6_291_456);
        assert_eq!(snap.uploaded_size, 0);
        assert_eq!(snap.percent, 0);
        assert_eq!(snap.throughput, None);
        assert_eq!(snap.eta, None);
    }

    #[test]
    fn weights_by_status_and_progress() {
        let (mut reg, session, ids) = setup(&[MIB, 2 * MIB, 3 * MIB]);
        reg.mark_uploading(ids[0]);
        reg.mark_completed(ids[0]);
        reg.mark_uploading(ids[1]);
        reg.apply_progress(ids[1], 50);

        assert_eq!(uploaded_bytes(&reg, &ids), 2 * MIB);

        let snap = aggregate(&session, &reg, Duration::from_secs(2));
        assert_eq!(snap.percent, 33);
        assert_eq!(snap.throughput, Some(MIB as f64));
        // 4 MiB left at 1 MiB/s
        assert_eq!(snap.eta, Some(EtaBucket::Seconds(4)));
    }

    #[test]
    fn all_completed_reaches_total() {
        let (mut reg, session, ids) = setup(&[MIB, 2 * MIB, 3 * MIB]);
        for id in &ids {
            reg.mark_uploading(*id);
            reg.mark_completed(*id);
        }
        let snap = aggregate(&session, &reg, Duration::from_secs(1));
        assert_eq!(snap.uploaded_size, 6_291_456);
        assert_eq!(snap.percent, 100);
        assert_eq!(snap.eta, Some(EtaBucket::Seconds(0)));
    }

    #[test]
    fn never_drops_below_stored_value() {
        let (mut reg, mut session, ids) = setup(&[MIB, MIB]);
        reg.mark_uploading(ids[0]);
        reg.apply_progress(ids[0], 80);

        let first = aggregate(&session, &reg, Duration::from_secs(1));
        session.uploaded_size = first.uploaded_size;

        reg.remove(ids[0]);
        let second = aggregate(&session, &reg, Duration::from_secs(2));
        assert_eq!(second.uploaded_size, first.uploaded_size);

        reg.mark_failed(ids[1]);
        let third = aggregate(&session, &reg, Duration::from_secs(3));
        assert!(third.uploaded_size >= second.uploaded_size);
    }

    #[test]
    fn non_participants_do_not_count() {
        let (mut reg, session, _) = setup(&[MIB]);
        let late = FileEntry::new(RawFile::declared("late.bin", MIB, "text/plain"));
        let late_id = late.id();
        reg.push(late);
        reg.mark_uploading(late_id);
        reg.mark_completed(late_id);

        let snap = aggregate(&session, &reg, Duration::from_secs(1));
        assert_eq!(snap.uploaded_size, 0);
        assert_eq!(snap.total_files, 1);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let (reg, session, _) = setup(&[0]);
        let snap = aggregate(&session, &reg, Duration::from_secs(1));
        assert_eq!(snap.percent, 0);
        assert_eq!(snap.throughput, Some(0.0));
        assert_eq!(snap.eta, None);
    }
}
