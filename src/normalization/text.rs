//! Leaf text utilities shared by the canonicalizers and the SKU
//! generator: Vietnamese diacritic folding and word-wise Pascal casing.

/// Vietnamese lower-case diacritics and their ASCII base letters.
const VIETNAMESE_FOLD: &[(char, char)] = &[
    ('à', 'a'),
    ('á', 'a'),
    ('ả', 'a'),
    ('ã', 'a'),
    ('ạ', 'a'),
    ('ă', 'a'),
    ('ằ', 'a'),
    ('ắ', 'a'),
    ('ẳ', 'a'),
    ('ẵ', 'a'),
    ('ặ', 'a'),
    ('â', 'a'),
    ('ầ', 'a'),
    ('ấ', 'a'),
    ('ẩ', 'a'),
    ('ẫ', 'a'),
    ('ậ', 'a'),
    ('đ', 'd'),
    ('è', 'e'),
    ('é', 'e'),
    ('ẻ', 'e'),
    ('ẽ', 'e'),
    ('ẹ', 'e'),
    ('ê', 'e'),
    ('ề', 'e'),
    ('ế', 'e'),
    ('ể', 'e'),
    ('ễ', 'e'),
    ('ệ', 'e'),
    ('ì', 'i'),
    ('í', 'i'),
    ('ỉ', 'i'),
    ('ĩ', 'i'),
    ('ị', 'i'),
    ('ò', 'o'),
    ('ó', 'o'),
    ('ỏ', 'o'),
    ('õ', 'o'),
    ('ọ', 'o'),
    ('ô', 'o'),
    ('ồ', 'o'),
    ('ố', 'o'),
    ('ổ', 'o'),
    ('ỗ', 'o'),
    ('ộ', 'o'),
    ('ơ', 'o'),
    ('ờ', 'o'),
    ('ớ', 'o'),
    ('ở', 'o'),
    ('ỡ', 'o'),
    ('ợ', 'o'),
    ('ù', 'u'),
    ('ú', 'u'),
    ('ủ', 'u'),
    ('ũ', 'u'),
    ('ụ', 'u'),
    ('ư', 'u'),
    ('ừ', 'u'),
    ('ứ', 'u'),
    ('ử', 'u'),
    ('ữ', 'u'),
    ('ự', 'u'),
    ('ỳ', 'y'),
    ('ý', 'y'),
    ('ỷ', 'y'),
    ('ỹ', 'y'),
    ('ỵ', 'y'),
];

fn fold_char(c: char) -> char {
    VIETNAMESE_FOLD
        .iter()
        .find(|(vn, _)| *vn == c)
        .map(|(_, base)| *base)
        .unwrap_or(c)
}

/// Lower-case, fold Vietnamese diacritics onto ASCII and strip every
/// character outside `[a-z ]`.
pub fn fold_diacritics(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(fold_char)
        .filter(|c| c.is_ascii_lowercase() || *c == ' ')
        .collect()
}

/// Word-wise Pascal casing: lower-case the whole string, then upper-case
/// the first character of each whitespace-delimited word and rejoin with
/// single spaces.
///
/// A word starting with a digit stays as-is (`"128Gb"` -> `"128gb"`);
/// this is the canonical form used both for hashing and for resolving
/// free-text feedback variants, so the two sides always agree.
pub fn pascal_case(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_vietnamese_brand_and_category_labels() {
        assert_eq!(fold_diacritics("Điện Thoại"), "dien thoai");
        assert_eq!(fold_diacritics("Máy Tính Đồng Bộ"), "may tinh dong bo");
        assert_eq!(fold_diacritics("Samsung"), "samsung");
    }

    #[test]
    fn strips_everything_outside_ascii_letters_and_spaces() {
        assert_eq!(fold_diacritics("Tủ lạnh 2-cửa (inverter)!"), "tu lanh cua inverter");
    }

    #[test]
    fn pascal_cases_word_by_word() {
        assert_eq!(pascal_case("ĐEN  bóng"), "Đen Bóng");
        assert_eq!(pascal_case("xanh dương"), "Xanh Dương");
    }

    #[test]
    fn digit_led_words_cannot_capitalize() {
        assert_eq!(pascal_case("128Gb"), "128gb");
        assert_eq!(pascal_case("8GB ram"), "8gb Ram");
    }
}
