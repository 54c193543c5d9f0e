use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// The placeholder tag pattern: `[<prefix>:<ColumnLetters><RowNumber>]`.
    ///
    /// The prefix may contain spaces, parentheses or punctuation but never a
    /// bracket, and the match is non-greedy so the shortest valid tag wins
    /// when a paragraph's text contains more than one colon. Capture group 1
    /// is the tag body (the qualified key without brackets).
    pub static ref TAG_REGEX: Regex =
        Regex::new(r"\[([^\[\]]*?:[A-Za-z]+[0-9]+)\]").unwrap();
}

/// Convert a zero-based column index to spreadsheet column letters
/// (0 = "A", 25 = "Z", 26 = "AA", ...).
///
/// Uses the standard multi-letter base-26 encoding rather than a single
/// `'A' + index` character, so tables wider than 26 columns address
/// correctly instead of breaking silently past column Z.
pub fn column_letters(col_idx: usize) -> String {
    let mut col = col_idx + 1;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert column letters back to a zero-based column index
/// ("A" = 0, "Z" = 25, "AA" = 26, ...). Returns `None` for empty or
/// non-alphabetic input.
pub fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    Some(col - 1)
}

/// Build an `A1`-style cell reference from zero-based row and column indices.
/// Rows are 1-based in the reference, matching spreadsheet display.
pub fn cell_reference(row_idx: usize, col_idx: usize) -> String {
    format!("{}{}", column_letters(col_idx), row_idx + 1)
}

/// Build the qualified key a tag body must match: `<prefix>:<cellref>`.
pub fn qualified_key(prefix: &str, row_idx: usize, col_idx: usize) -> String {
    format!("{}:{}", prefix, cell_reference(row_idx, col_idx))
}
