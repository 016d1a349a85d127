//! Sentence segmentation for attribution. Splits on `.`, `!`, `?` while
//! refusing to break after abbreviations, inside decimal numbers, or inside
//! quoted speech. Every returned sentence is a trimmed, byte-identical
//! substring of the input, and the slices jointly cover the whole body, so
//! concatenating them reconstructs the input modulo whitespace.

/// Lowercased tokens that end with a period without ending a sentence.
/// Single-letter tokens (initials like "J.") are handled separately.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "gen", "col", "sgt", "lt", "st", "mt", "vs", "etc", "approx",
    "dept", "est", "inc", "ltd", "co", "jr", "sr", "no", "u.s", "u.k", "u.n", "e.g", "i.e", "a.m",
    "p.m",
];

const TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSING_QUOTES: [char; 3] = ['"', '\u{201D}', '\''];

pub fn split_sentences(body: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize; // byte offset of the current sentence
    let mut in_quote = false;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '"' => in_quote = !in_quote,
            '\u{201C}' => in_quote = true,
            '\u{201D}' => in_quote = false,
            '.' | '!' | '?' => {
                if c == '.' && (is_decimal_point(&chars, i) || is_abbreviation(&chars, i)) {
                    i += 1;
                    continue;
                }
                // absorb a terminator run ("?!", "...") plus trailing quotes
                let mut j = i;
                while j + 1 < chars.len() && TERMINATORS.contains(&chars[j + 1].1) {
                    j += 1;
                }
                let mut closed_quote = false;
                while j + 1 < chars.len() && CLOSING_QUOTES.contains(&chars[j + 1].1) {
                    if matches!(chars[j + 1].1, '"' | '\u{201D}') {
                        closed_quote = true;
                    }
                    j += 1;
                }
                // a terminator inside quoted speech only ends the sentence
                // when the quote itself closes right after it
                if in_quote && !closed_quote {
                    i += 1;
                    continue;
                }
                let at_end = j + 1 >= chars.len();
                if at_end || chars[j + 1].1.is_whitespace() {
                    if closed_quote {
                        in_quote = false;
                    }
                    let end = chars[j].0 + chars[j].1.len_utf8();
                    let slice = body[start..end].trim();
                    if !slice.is_empty() {
                        sentences.push(slice.to_string());
                    }
                    start = end;
                    i = j + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let tail = body[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Period between two digits, as in "3.5" or "v2.0".
fn is_decimal_point(chars: &[(usize, char)], i: usize) -> bool {
    i > 0
        && i + 1 < chars.len()
        && chars[i - 1].1.is_ascii_digit()
        && chars[i + 1].1.is_ascii_digit()
}

/// The word immediately before this period reads as an abbreviation.
fn is_abbreviation(chars: &[(usize, char)], i: usize) -> bool {
    let mut token: Vec<char> = Vec::new();
    let mut k = i;
    while k > 0 {
        let ch = chars[k - 1].1;
        if ch.is_alphanumeric() || ch == '.' {
            token.push(ch);
            k -= 1;
        } else {
            break;
        }
    }
    if token.is_empty() {
        return false;
    }
    let token: String = token.iter().rev().collect::<String>().to_lowercase();
    if token.chars().count() == 1 && token.chars().all(|c| c.is_alphabetic()) {
        return true; // an initial, e.g. "J. Smith"
    }
    ABBREVIATIONS.contains(&token.as_str())
}
