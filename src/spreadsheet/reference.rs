//! Excel-style cell references (`A1`, `AB12`) and 0-based indexes.
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("Hardcode regex pattern"));

/// Converts column letters to a 0-based index: A = 0, Z = 25, AA = 26.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .chars()
        .map(|letter| letter as usize - 'A' as usize + 1)
        .reduce(|index, digit| index * 26 + digit)
        .map(|col| col - 1)
}

/// Converts a 1-based row number string to a 0-based index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts a 0-based column index to letters.
pub(crate) fn index_to_col(col: usize) -> String {
    let mut letters = Vec::new();
    let mut value = col + 1;
    while value > 0 {
        let remainder = (value - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        value = (value - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts 0-based (row, col) to a reference such as `C7`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

/// Parses a reference such as `C7` (absolute markers allowed) to 0-based (row, col).
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE_PATTERN.captures(reference.trim())?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    Some((row, col))
}

/// Parses a range such as `A1:F1` to 0-based ((row, col), (row, col)).
/// A single reference yields a one-cell range.
pub(crate) fn range_to_index(range: &str) -> Option<((usize, usize), (usize, usize))> {
    match range.split_once(':') {
        Some((first, last)) => Some((reference_to_index(first)?, reference_to_index(last)?)),
        None => reference_to_index(range).map(|cell| (cell, cell)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_convert_both_ways() {
        for (letters, index) in [("A", 0), ("Z", 25), ("AA", 26), ("AZ", 51), ("BA", 52), ("BY", 76)] {
            assert_eq!(col_to_index(letters), Some(index));
            assert_eq!(index_to_col(index), letters);
        }
        assert_eq!(col_to_index("a"), Some(0));
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);
    }

    #[test]
    fn references_convert_both_ways() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("$C$7"), Some((6, 2)));
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("1A"), None);
        assert_eq!(index_to_reference(6, 2), "C7");
    }

    #[test]
    fn ranges_parse() {
        assert_eq!(range_to_index("A1:F1"), Some(((0, 0), (0, 5))));
        assert_eq!(range_to_index("B2"), Some(((1, 1), (1, 1))));
        assert_eq!(range_to_index("A1:"), None);
    }
}
