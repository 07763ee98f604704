//! # Step Splitter
//!
//! Plans are divided into steps by lines that contain only the delimiter token.

/// Step delimiter token. A line whose trimmed content equals this separates two steps.
pub const DELIMITER: &str = "------";

fn is_delimiter(line: &str) -> bool {
    line.trim() == DELIMITER
}

/// Splits plan text into ordered, non-empty steps. Text without delimiter lines is one step.
pub fn split_plan(text: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_delimiter(line) {
            push_segment(&mut steps, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_segment(&mut steps, &current);

    steps
}

fn push_segment(steps: &mut Vec<String>, lines: &[&str]) {
    let segment = trim_edges(lines, |line| line.trim().is_empty());
    if !segment.is_empty() {
        steps.push(segment);
    }
}

/// Drops leading and trailing lines matching `skip`; inner lines keep their whitespace.
fn trim_edges(lines: &[&str], skip: impl Fn(&str) -> bool) -> String {
    let Some(start) = lines.iter().position(|l| !skip(l)) else {
        return String::new();
    };
    let end = lines.iter().rposition(|l| !skip(l)).unwrap_or(start);
    lines[start..=end].join("\n")
}

/// Joins segments with exactly one delimiter line between neighbours.
/// Delimiter lines and blank lines at the edges of each segment are dropped first,
/// so parts that already end or start with a delimiter do not produce doubles.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| trim_delimiters(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n", DELIMITER))
}

/// Strips leading/trailing delimiter lines and blank lines. Indentation of the kept lines
/// is preserved.
pub fn trim_delimiters(segment: &str) -> String {
    let lines: Vec<&str> = segment.lines().collect();
    trim_edges(&lines, |line| line.trim().is_empty() || is_delimiter(line))
}
