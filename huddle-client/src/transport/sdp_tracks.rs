use huddle_core::TrackKind;

/// Track kinds announced in a session description. Tracks are identified by
/// their kind, so the second token of each `a=msid:` line names one.
pub fn track_kinds(sdp: &str) -> Vec<TrackKind> {
    let mut kinds: Vec<TrackKind> = sdp
        .lines()
        .filter_map(|line| line.trim().strip_prefix("a=msid:"))
        .filter_map(|msid| msid.split_whitespace().nth(1))
        .filter_map(TrackKind::parse)
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TrackDiff {
    pub removed: Vec<TrackKind>,
    pub added: Vec<TrackKind>,
}

pub fn diff_tracks(before: &[TrackKind], after: &[TrackKind]) -> TrackDiff {
    TrackDiff {
        removed: before.iter().filter(|k| !after.contains(k)).copied().collect(),
        added: after.iter().filter(|k| !before.contains(k)).copied().collect(),
    }
}
