//! Diff rendering for payload comparison.

/// Render a line diff between the reference and subject payloads.
///
/// Lines are shown with ASCII escapes so tabs, vertical tabs, and trailing
/// spaces stay visible.
#[must_use]
pub fn render_diff(expected: &[u8], actual: &[u8]) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&[u8]> = expected.split(|&b| b == b'\n').collect();
    let actual_lines: Vec<&[u8]> = actual.split(|&b| b == b'\n').collect();

    let mut out = String::new();
    out.push_str("--- reference\n");
    out.push_str("+++ subject\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i);
        let a = actual_lines.get(i);
        if e == a {
            continue;
        }
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        if let Some(e) = e {
            out.push_str(&format!("-\"{}\"\n", e.escape_ascii()));
        }
        if let Some(a) = a {
            out.push_str(&format!("+\"{}\"\n", a.escape_ascii()));
        }
    }
    if let Some(offset) = first_difference(expected, actual) {
        out.push_str(&format!("first difference at byte {offset}\n"));
    }
    out
}

/// Offset of the first differing byte, counting a length mismatch as a difference.
#[must_use]
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_payloads() {
        assert_eq!(render_diff(b"0x2a", b"0x2a"), "[identical]");
        assert_eq!(first_difference(b"abc", b"abc"), None);
    }

    #[test]
    fn single_line_difference_is_escaped() {
        let diff = render_diff(b"ab   ", b"   ab\t");
        assert!(diff.contains("-\"ab   \""), "{diff}");
        assert!(diff.contains("+\"   ab\\t\""), "{diff}");
        assert!(diff.contains("first difference at byte 0"), "{diff}");
    }

    #[test]
    fn extra_lines_are_reported() {
        let diff = render_diff(b"a\nb", b"a");
        assert!(diff.contains("@@ line 2 @@"), "{diff}");
        assert!(diff.contains("-\"b\""), "{diff}");
        assert!(!diff.contains("@@ line 1 @@"), "{diff}");
        assert!(diff.contains("first difference at byte 1"), "{diff}");
    }

    #[test]
    fn prefix_payload_differs_at_its_length() {
        assert_eq!(first_difference(b"nan", b"nan%"), Some(3));
        assert_eq!(first_difference(b"NaN", b"nan"), Some(0));
    }
}
