//! Colors handed out to newly created tag options.

use crate::column::TagOption;

/// Tag chip colors, assigned round-robin.
pub const TAG_COLORS: &[&str] = &[
    "#3b82f6", // blue
    "#22c55e", // green
    "#f59e0b", // amber
    "#ef4444", // red
    "#a855f7", // purple
    "#14b8a6", // teal
    "#ec4899", // pink
    "#64748b", // slate
];

/// Color for the next option appended after `existing`.
pub fn next_color(existing: &[TagOption]) -> &'static str {
    TAG_COLORS[existing.len() % TAG_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(i: usize) -> TagOption {
        TagOption { id: format!("o{i}"), label: format!("L{i}"), color: String::new() }
    }

    #[test]
    fn wraps_around() {
        assert_eq!(next_color(&[]), TAG_COLORS[0]);
        let many: Vec<_> = (0..TAG_COLORS.len()).map(opt).collect();
        assert_eq!(next_color(&many), TAG_COLORS[0]);
        assert_eq!(next_color(&many[..3]), TAG_COLORS[3]);
    }
}
