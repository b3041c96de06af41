//! Maps free-text variant attribute labels onto the fixed attribute
//! taxonomy. Rules are an explicit ordered list evaluated first-match-
//! wins so the priority is inspectable and testable on its own.

/// One canonicalization rule: if any keyword is a substring of the
/// lower-cased label, the label maps to `canonical`.
#[derive(Debug, Clone, Copy)]
pub struct AttributeRule {
    pub keywords: &'static [&'static str],
    pub canonical: &'static str,
    /// The color rule must not fire for numeric "color codes", so it
    /// additionally requires the value to contain no digit.
    pub reject_digit_values: bool,
}

/// Label matching none of the rules falls through to this bucket.
pub const CATCH_ALL: &str = "Lựa chọn";

/// Priority-ordered canonicalization rules. Earlier entries win.
pub const ATTRIBUTE_RULES: &[AttributeRule] = &[
    AttributeRule {
        keywords: &["màu", "colour", "color"],
        canonical: "Màu",
        reject_digit_values: true,
    },
    AttributeRule {
        keywords: &["dung lượng", "ram", "memory", "storage"],
        canonical: "Dung lượng",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["model", "model camera", "lựa chọn mẫu", "mẫu"],
        canonical: "Model",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["độ phân giải", "phân giải", "resolution"],
        canonical: "Độ phân giải",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["công suất", "power"],
        canonical: "Công suất",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["bảo hành", "warranty"],
        canonical: "Bảo hành",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["chip", "cpu", "vi xử lý", "processor"],
        canonical: "Chip",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["hệ điều hành", "os", "operating system", "win"],
        canonical: "Hệ điều hành",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["màn", "display", "screen"],
        canonical: "Màn hình",
        reject_digit_values: false,
    },
    AttributeRule {
        keywords: &["bút", "pen"],
        canonical: "Bút đi kèm",
        reject_digit_values: false,
    },
];

/// Canonicalize a raw attribute label given its (already normalized)
/// value. Pure and idempotent: every canonical name re-matches its own
/// rule or the catch-all.
pub fn canonical_attribute(label: &str, value: &str) -> &'static str {
    let label = label.to_lowercase();
    let value_has_digit = value.chars().any(|c| c.is_ascii_digit());
    for rule in ATTRIBUTE_RULES {
        if rule.reject_digit_values && value_has_digit {
            continue;
        }
        if rule.keywords.iter().any(|kw| label.contains(kw)) {
            return rule.canonical;
        }
    }
    CATCH_ALL
}
