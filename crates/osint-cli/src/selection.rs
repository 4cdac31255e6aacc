//! Module selection syntax: `1,3,5-7`, or `todos` for every module.

osint_lookup::static_regex!(
    selection_re,
    r"^\s*\d+(\s*-\s*\d+)?(\s*,\s*\d+(\s*-\s*\d+)?)*\s*$"
);

/// Parse a selection into 1-based module numbers.
///
/// The whole input must match the syntax, otherwise the result is empty.
/// Reversed ranges and numbers outside `1..=total` are dropped, and
/// duplicates keep their first position.
pub fn parse_selection(raw: &str, total: usize) -> Vec<usize> {
    let raw = raw.trim().to_lowercase();
    if raw == "todos" || raw == "all" {
        return (1..=total).collect();
    }
    if !selection_re().is_match(&raw) {
        return Vec::new();
    }

    let mut picked = Vec::new();
    let mut pick = |n: usize| {
        if (1..=total).contains(&n) && !picked.contains(&n) {
            picked.push(n);
        }
    };
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
                else {
                    continue;
                };
                // Clamp so a huge upper bound does not iterate for long.
                for n in start..=end.min(total) {
                    pick(n);
                }
            }
            None => {
                if let Ok(n) = part.parse::<usize>() {
                    pick(n);
                }
            }
        }
    }
    picked
}
