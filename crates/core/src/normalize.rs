use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turkish letters folded to their ASCII base letter, both cases.
const TURKISH_FOLD: [(char, char); 12] = [
    ('ç', 'c'),
    ('ğ', 'g'),
    ('ı', 'i'),
    ('ö', 'o'),
    ('ş', 's'),
    ('ü', 'u'),
    ('Ç', 'C'),
    ('Ğ', 'G'),
    ('İ', 'I'),
    ('Ö', 'O'),
    ('Ş', 'S'),
    ('Ü', 'U'),
];

/// The same letters in decomposed form: base letter and the mark it carries.
const TURKISH_MARKS: [(char, char); 6] = [
    ('c', '\u{0327}'),
    ('s', '\u{0327}'),
    ('g', '\u{0306}'),
    ('o', '\u{0308}'),
    ('u', '\u{0308}'),
    ('i', '\u{0307}'),
];

fn fold_char(ch: char) -> char {
    TURKISH_FOLD
        .iter()
        .find(|(accented, _)| *accented == ch)
        .map(|(_, plain)| *plain)
        .unwrap_or(ch)
}

fn is_turkish_mark(base: Option<char>, mark: char) -> bool {
    base.is_some_and(|base| TURKISH_MARKS.contains(&(base.to_ascii_lowercase(), mark)))
}

fn fold(text: &str) -> String {
    let mut base = None;
    let mut folded = String::with_capacity(text.len());

    for ch in text.chars().map(fold_char).nfkd() {
        if !is_combining_mark(ch) {
            base = Some(ch);
        } else if is_turkish_mark(base, ch) {
            continue;
        }
        folded.push(ch);
    }

    folded
}

// `İ` lowercases to `i` plus a combining dot, so the fold runs on both sides.
pub fn normalize_text(text: &str) -> String {
    let lowered = fold(text).to_lowercase();
    fold(&lowered).trim().to_string()
}
