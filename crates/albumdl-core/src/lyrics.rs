//! Lyrics merging (catalog first, secondary source for gaps) and LRC rendering.

use crate::catalog::{Lyrics, SyncedLine};

/// True when the secondary source should be asked: no plain text yet, or synced
/// lines are wanted and missing.
pub fn needs_secondary(current: &Lyrics, want_synced: bool) -> bool {
    current.plain.trim().is_empty() || (want_synced && current.synced.is_empty())
}

/// Fills only the gaps of `current` from `secondary`; never overwrites what the catalog gave.
pub fn fill_gaps(current: &mut Lyrics, secondary: Lyrics, want_synced: bool) {
    if current.plain.trim().is_empty() {
        current.plain = secondary.plain;
    }
    if want_synced && current.synced.is_empty() {
        current.synced = secondary.synced;
    }
}

/// One `[mm:ss.xx] text` line per entry; entries without timestamp or text are skipped.
pub fn render_lrc(lines: &[SyncedLine]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.timestamp.is_empty() || line.text.is_empty() {
            continue;
        }
        out.push_str(&line.timestamp);
        out.push(' ');
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}
