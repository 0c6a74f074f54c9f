use crate::model::{CanonicalBooking, MergedRun};

/// Collapse back-to-back bookings by the same occupant into display runs.
///
/// Sort ascending by start, then a single pass: the current run is extended
/// when the next booking has the same occupant and starts exactly where the
/// run ends (zero gap). Each run keeps every absorbed source id. Gaps and
/// occupant changes close the run, even when the bookings are adjacent in
/// sort order.
pub fn merge_contiguous(bookings: &[CanonicalBooking]) -> Vec<MergedRun> {
    merge_runs(bookings.iter().map(MergedRun::from_booking).collect())
}

/// Same algorithm over runs, so merging is idempotent on its own output.
pub fn merge_runs(mut runs: Vec<MergedRun>) -> Vec<MergedRun> {
    runs.sort_by_key(|r| r.range.start);
    let mut merged: Vec<MergedRun> = Vec::new();
    for run in runs {
        if let Some(last) = merged.last_mut()
            && last.occupant == run.occupant
            && last.range.end == run.range.start
        {
            last.range.end = run.range.end;
            last.source_ids.extend(run.source_ids);
            continue;
        }
        merged.push(run);
    }
    merged
}
