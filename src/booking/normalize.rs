use crate::model::TimeSpec;

/// Normalize a stored time expression to the explicit-pair form.
///
/// An explicit pair always wins and passes through unchanged — this is the
/// forward-compatibility path for hour-granular records coexisting with
/// legacy coarse ones. A bare slot tag is mapped to its fixed boundary pair
/// (the tag is kept). A spec with neither form is returned unchanged; the
/// caller must treat it as unschedulable rather than defaulting it.
pub fn normalize_slot(spec: &TimeSpec) -> TimeSpec {
    if spec.start.is_some() && spec.end.is_some() {
        return spec.clone();
    }
    match spec.slot {
        Some(slot) => {
            let range = slot.range();
            TimeSpec {
                slot: Some(slot),
                start: Some(range.start),
                end: Some(range.end),
            }
        }
        None => spec.clone(),
    }
}
