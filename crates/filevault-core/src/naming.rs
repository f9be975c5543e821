//! Short names and storage-safe filenames.
//!
//! A short name is a random UUID rendered in a 57-symbol alphabet that leaves out
//! look-alike characters (`0`, `1`, `I`, `O`, `l`). Filenames are transliterated from
//! Cyrillic to Latin and reduced to characters that are safe in object keys and headers.

use uuid::Uuid;

const ALPHABET: &[u8; 57] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of every generated short name; 57^22 covers the whole 128-bit space.
pub const SHORT_NAME_LEN: usize = 22;

const FALLBACK_STEM: &str = "file";

/// Generate a new short name from a random v4 UUID.
pub fn generate_short_name() -> String {
    encode_short_name(Uuid::new_v4())
}

/// Render a UUID as a fixed-width base57 string, most significant digit first.
pub fn encode_short_name(id: Uuid) -> String {
    let base = ALPHABET.len() as u128;
    let mut value = id.as_u128();
    let mut digits = Vec::with_capacity(SHORT_NAME_LEN);
    while value > 0 {
        digits.push(ALPHABET[(value % base) as usize]);
        value /= base;
    }
    while digits.len() < SHORT_NAME_LEN {
        digits.push(ALPHABET[0]);
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Whether `value` could have been produced by [`generate_short_name`].
pub fn is_valid_short_name(value: &str) -> bool {
    value.len() == SHORT_NAME_LEN && value.bytes().all(|b| ALPHABET.contains(&b))
}

fn transliterate_char(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shh",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ё' => "Yo",
        'Ж' => "Zh",
        'З' => "Z",
        'И' => "I",
        'Й' => "J",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "H",
        'Ц' => "C",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Shh",
        'Ъ' | 'Ь' => "",
        'Ы' => "Y",
        'Э' => "E",
        'Ю' => "Yu",
        'Я' => "Ya",
        _ => return None,
    };
    Some(latin)
}

/// Replace Russian Cyrillic letters with their Latin spelling; other characters pass through.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match transliterate_char(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Keep `[A-Za-z0-9._-]`, turn every other run of characters into a single `_` and
/// collapse runs of `.` so no `..` survives.
fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_replacement = false;
    for c in input.chars() {
        if c == '.' && out.ends_with('.') {
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            out.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            out.push('_');
            last_was_replacement = true;
        }
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Normalize an uploaded filename into its stored display name.
///
/// Path components sent by some clients are dropped, the name is transliterated and
/// sanitized, and the extension after the last `.` is kept.
pub fn normalize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    let latin = transliterate(base);

    let (stem, extension) = match latin.rfind('.') {
        Some(idx) if idx > 0 => (&latin[..idx], Some(&latin[idx + 1..])),
        _ => (latin.as_str(), None),
    };

    let mut stem = sanitize_component(stem);
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }

    match extension.map(sanitize_component) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
        _ => stem,
    }
}

/// Object key for a stored file: `{short_name}/{filename}`.
pub fn storage_path(short_name: &str, normalized_filename: &str) -> String {
    format!("{}/{}", short_name, normalized_filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_short_name_shape() {
        let name = generate_short_name();
        assert_eq!(name.len(), SHORT_NAME_LEN);
        assert!(is_valid_short_name(&name));
    }

    #[test]
    fn test_short_name_extremes() {
        assert_eq!(encode_short_name(Uuid::nil()), "2".repeat(SHORT_NAME_LEN));
        let max = encode_short_name(Uuid::max());
        assert_eq!(max.len(), SHORT_NAME_LEN);
        assert!(is_valid_short_name(&max));
    }

    #[test]
    fn test_short_names_do_not_repeat() {
        let names: HashSet<String> = (0..10_000).map(|_| generate_short_name()).collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn test_invalid_short_names() {
        assert!(!is_valid_short_name(""));
        assert!(!is_valid_short_name("../../etc/passwd"));
        assert!(!is_valid_short_name(&"0".repeat(SHORT_NAME_LEN)));
    }

    #[test]
    fn test_transliterate_russian() {
        assert_eq!(transliterate("отчёт"), "otchyot");
        assert_eq!(transliterate("Щука и ёж"), "Shhuka i yozh");
        assert_eq!(transliterate("объявление"), "obyavlenie");
        assert_eq!(transliterate("plain"), "plain");
    }

    #[test]
    fn test_normalize_keeps_extension() {
        assert_eq!(normalize_filename("отчёт.pdf"), "otchyot.pdf");
        assert_eq!(normalize_filename("report.final.PDF"), "report.final.PDF");
        assert_eq!(normalize_filename("Мой файл (1).docx"), "Moj_fajl_1.docx");
    }

    #[test]
    fn test_normalize_strips_paths_and_unsafe_characters() {
        assert_eq!(normalize_filename("../../etc/passwd"), "passwd");
        assert_eq!(normalize_filename("C:\\Users\\me\\photo.jpg"), "photo.jpg");
        assert_eq!(normalize_filename("a  b??c.txt"), "a_b_c.txt");
    }

    #[test]
    fn test_normalize_collapses_inner_dot_runs() {
        assert_eq!(normalize_filename("a..b.txt"), "a.b.txt");
        assert_eq!(normalize_filename("v1..final.doc"), "v1.final.doc");
        assert_eq!(normalize_filename("Loading....png"), "Loading.png");
        assert!(!normalize_filename("x...y..z").contains(".."));
    }

    #[test]
    fn test_normalize_falls_back_for_empty_stem() {
        assert_eq!(normalize_filename(""), "file");
        assert_eq!(normalize_filename("???.png"), "file.png");
        assert_eq!(normalize_filename(".bashrc"), "bashrc");
        assert_eq!(normalize_filename("日本語.txt"), "file.txt");
    }

    #[test]
    fn test_storage_path_starts_with_short_name() {
        let short = generate_short_name();
        let path = storage_path(&short, &normalize_filename("отчёт.pdf"));
        assert!(path.starts_with(&format!("{}/", short)));
        assert!(path.ends_with("/otchyot.pdf"));
    }
}
