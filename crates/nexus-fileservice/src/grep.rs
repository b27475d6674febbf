use nexus_metadata::NormalizedPath;
use regex::Regex;

use crate::types::GrepHit;

/// Matches `regex` against each line of `bytes`, decoded as UTF-8. Per
/// SPEC_FULL.md's resolution of the `grep` binary-content open question,
/// files that fail to decode as UTF-8 are skipped without error rather than
/// surfacing a validation failure.
pub(crate) fn grep_file(path: &NormalizedPath, bytes: &[u8], regex: &Regex, limit: usize) -> Vec<GrepHit> {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if hits.len() >= limit {
            break;
        }
        if let Some(found) = regex.find(line) {
            hits.push(GrepHit {
                path: path.clone(),
                line: idx as u64 + 1,
                content: line.to_owned(),
                matched: found.as_str().to_owned(),
            });
        }
    }
    hits
}
