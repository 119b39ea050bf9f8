use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::DateTime;
use enostr::Note;
use serde::Serialize;

use crate::classify::{Classified, KindSelection, KindStats};
use crate::kinds::KindNamer;
use crate::label::label;
use crate::liveness::LivenessSnapshot;
use crate::Result;

/// ISO-8601 in UTC, or the raw number when it is out of chrono's range.
pub fn timestamp(created_at: u64) -> String {
    i64::try_from(created_at)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| created_at.to_string())
}

fn note_line(out: &mut String, note: &Note, namer: &KindNamer) {
    let id = note.id.hex();
    let _ = writeln!(
        out,
        "  {}  {:<24} {}  {}",
        timestamp(note.created_at),
        namer.name_of(note.kind),
        id.get(..8).unwrap_or(&id),
        label(note)
    );
}

pub fn text(
    classified: &Classified,
    liveness: LivenessSnapshot,
    selection: KindSelection,
    namer: &KindNamer,
) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "relays: {} connected, {} failed, {} total",
        liveness.connected, liveness.failed, liveness.total
    );
    let _ = writeln!(
        out,
        "notes: {} across {} kinds",
        classified.stats.total, classified.stats.unique_kinds
    );

    if classified.is_empty() {
        out.push_str("\nno notes found\n");
        return out;
    }

    out.push('\n');
    for (kind, group) in &classified.groups {
        let _ = writeln!(
            out,
            "  {:>6}  {:<32} {}",
            kind,
            namer.name_of(*kind),
            group.len()
        );
    }

    let notes = classified.select(selection);
    out.push('\n');
    match selection {
        KindSelection::All => {
            let _ = writeln!(out, "all notes, newest first:");
        }
        KindSelection::Kind(kind) => {
            let _ = writeln!(out, "{} (kind {}):", namer.name_of(kind), kind);
        }
    }

    if notes.is_empty() {
        out.push_str("  (none)\n");
    }
    for note in notes {
        note_line(&mut out, note, namer);
    }

    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    liveness: LivenessSnapshot,
    stats: KindStats,
    names: BTreeMap<u64, String>,
    groups: BTreeMap<u64, &'a [Note]>,
}

/// Same data as [`text`], as a JSON object. A kind selection limits the
/// groups that are included, the stats always cover everything fetched.
pub fn json(
    classified: &Classified,
    liveness: LivenessSnapshot,
    selection: KindSelection,
    namer: &KindNamer,
) -> Result<String> {
    let groups: BTreeMap<u64, &[Note]> = classified
        .groups
        .iter()
        .filter(|(kind, _)| match selection {
            KindSelection::All => true,
            KindSelection::Kind(selected) => **kind == selected,
        })
        .map(|(kind, group)| (*kind, group.as_slice()))
        .collect();

    let names = groups
        .keys()
        .map(|kind| (*kind, namer.name_of(*kind)))
        .collect();

    let report = JsonReport {
        liveness,
        stats: classified.stats,
        names,
        groups,
    };

    Ok(serde_json::to_string_pretty(&report)?)
}
