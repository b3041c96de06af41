//! Per-source-file category reconciliation: each raw export carries its
//! own category vocabulary, remapped here onto the unified taxonomy.
//!
//! Every source has an ordered step list evaluated top to bottom; later
//! steps see earlier steps' output. Keyword promotions are an explicit
//! priority list with LAST MATCH WINS: all promotions in one contiguous
//! run are tested against the category the row had when the run started,
//! and the last one whose keywords hit the product name takes effect.

/// A single reconciliation step.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Rename one raw label.
    Replace {
        from: &'static str,
        to: &'static str,
    },
    /// Overwrite the category of every row from this source.
    ForceAll { to: &'static str },
    /// Reclassify rows whose product name contains any keyword
    /// (case-insensitive substring). An empty guard applies to every
    /// row regardless of its current category.
    Promote {
        only_when_in: &'static [&'static str],
        keywords: &'static [&'static str],
        to: &'static str,
    },
}

const GENERIC_ELECTRONICS: &[&str] = &["Điện Tử - Điện Lạnh", "Root"];

/// Reconciliation programs keyed by source file, in the fixed source
/// order the cleaned frames are concatenated in.
pub const SOURCE_RULES: &[(&str, &[Step])] = &[
    (
        "dienthoai",
        &[
            Step::Replace {
                from: "Điện Thoại - Máy Tính Bảng",
                to: "Điện thoại Smartphone",
            },
            Step::Replace {
                from: "Root",
                to: "Điện thoại Smartphone",
            },
            Step::Replace {
                from: "Phụ kiện",
                to: "Phụ kiện điện thoại",
            },
        ],
    ),
    ("mayban", &[Step::ForceAll { to: "Điện thoại bàn" }]),
    (
        "cucgach",
        &[Step::ForceAll {
            to: "Điện thoại phổ thông",
        }],
    ),
    ("dieuhoa", &[]),
    (
        "laptop",
        &[
            Step::Replace {
                from: "Laptop - Máy Vi Tính - Linh kiện",
                to: "Laptop Truyền Thống",
            },
            Step::Replace {
                from: "Laptop",
                to: "Laptop Truyền Thống",
            },
            Step::Replace {
                from: "Root",
                to: "Laptop Truyền Thống",
            },
        ],
    ),
    (
        "maydocsach",
        &[
            Step::ForceAll { to: "Máy đọc sách" },
            Step::Promote {
                only_when_in: &[],
                keywords: &["máy tính bảng"],
                to: "Máy tính bảng",
            },
        ],
    ),
    ("maygiat", &[]),
    ("maytinhbang", &[Step::ForceAll { to: "Máy tính bảng" }]),
    (
        "tivi",
        &[
            Step::Promote {
                only_when_in: GENERIC_ELECTRONICS,
                keywords: &["oled"],
                to: "Tivi OLED",
            },
            Step::Promote {
                only_when_in: GENERIC_ELECTRONICS,
                keywords: &["qled"],
                to: "Tivi QLED",
            },
            Step::Promote {
                only_when_in: GENERIC_ELECTRONICS,
                keywords: &["smart", "android"],
                to: "Smart Tivi - Android Tivi",
            },
            Step::Promote {
                only_when_in: GENERIC_ELECTRONICS,
                keywords: &["led"],
                to: "Tivi thường (LED)",
            },
            Step::Promote {
                only_when_in: GENERIC_ELECTRONICS,
                keywords: &["4k"],
                to: "Tivi 4K",
            },
            Step::Replace {
                from: "Điện Tử - Điện Lạnh",
                to: "Smart Tivi - Android Tivi",
            },
        ],
    ),
    (
        "tulanh",
        &[Step::Replace {
            from: "Điện Tử - Điện Lạnh",
            to: "Tủ lạnh",
        }],
    ),
    (
        "camgiamsat",
        &[
            Step::Replace {
                from: "Camera IP",
                to: "Camera IP - Camera Wifi",
            },
            Step::Replace {
                from: "Máy Ảnh - Máy Quay Phim",
                to: "Camera IP - Camera Wifi",
            },
            Step::Promote {
                only_when_in: &["Root"],
                keywords: &["ip", "wifi"],
                to: "Camera IP - Camera Wifi",
            },
            Step::Replace {
                from: "Root",
                to: "Phụ Kiện Camera Giám Sát",
            },
        ],
    ),
    (
        "pc",
        &[
            Step::Replace {
                from: "Máy Tính Bộ Thương Hiệu",
                to: "Máy tính đồng bộ",
            },
            Step::Replace {
                from: "Root",
                to: "Máy tính đồng bộ",
            },
            Step::Replace {
                from: "PC - Máy Tính Bộ",
                to: "Máy tính đồng bộ",
            },
            Step::Promote {
                only_when_in: &["Laptop - Máy Vi Tính - Linh kiện"],
                keywords: &["mini", "siêu nhỏ"],
                to: "Mini PC",
            },
            Step::Replace {
                from: "Laptop - Máy Vi Tính - Linh kiện",
                to: "Máy tính đồng bộ",
            },
        ],
    ),
    ("mayanh", &[]),
];

pub fn rules_for(source: &str) -> &'static [Step] {
    SOURCE_RULES
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, steps)| *steps)
        .unwrap_or(&[])
}

fn name_matches(keywords: &[&str], product_name: &str) -> bool {
    let name = product_name.to_lowercase();
    keywords.iter().any(|kw| name.contains(kw))
}

/// Reconcile one row's raw category label for the given source file.
pub fn reconcile(source: &str, raw_category: &str, product_name: &str) -> String {
    let mut current = raw_category.to_string();
    // Category at the start of the active promotion run; promotions are
    // guarded against it so a later promotion can override an earlier
    // one instead of being blocked by it.
    let mut promote_base: Option<String> = None;
    for step in rules_for(source) {
        match step {
            Step::Replace { from, to } => {
                promote_base = None;
                if current == *from {
                    current = (*to).to_string();
                }
            }
            Step::ForceAll { to } => {
                promote_base = None;
                current = (*to).to_string();
            }
            Step::Promote {
                only_when_in,
                keywords,
                to,
            } => {
                let base = promote_base.get_or_insert_with(|| current.clone());
                let guarded = only_when_in.is_empty()
                    || only_when_in.iter().any(|allowed| *allowed == base.as_str());
                if guarded && name_matches(keywords, product_name) {
                    current = (*to).to_string();
                }
            }
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaps_raw_labels_per_source() {
        assert_eq!(
            reconcile("dienthoai", "Điện Thoại - Máy Tính Bảng", "iPhone 15"),
            "Điện thoại Smartphone"
        );
        assert_eq!(
            reconcile("dienthoai", "Phụ kiện", "Ốp lưng"),
            "Phụ kiện điện thoại"
        );
        assert_eq!(reconcile("tulanh", "Điện Tử - Điện Lạnh", "Tủ lạnh LG"), "Tủ lạnh");
    }

    #[test]
    fn forced_sources_ignore_the_raw_label() {
        assert_eq!(reconcile("mayban", "Root", "Panasonic KX"), "Điện thoại bàn");
        assert_eq!(
            reconcile("maytinhbang", "Bất kỳ", "iPad Air"),
            "Máy tính bảng"
        );
    }

    #[test]
    fn unknown_sources_pass_labels_through() {
        assert_eq!(reconcile("dieuhoa", "Điều hòa", "Daikin 9000btu"), "Điều hòa");
    }

    #[test]
    fn later_keyword_rules_override_earlier_ones() {
        // Matches both "oled" (priority 1) and "4k" (priority 5): the
        // last matching rule decides.
        assert_eq!(
            reconcile("tivi", "Root", "Tivi OLED LG 55 inch 4K"),
            "Tivi 4K"
        );
        // Only "oled" matches.
        assert_eq!(reconcile("tivi", "Root", "Tivi OLED LG"), "Tivi OLED");
    }

    #[test]
    fn tivi_generic_leftovers_become_smart_tivi() {
        assert_eq!(
            reconcile("tivi", "Điện Tử - Điện Lạnh", "Tivi Casper"),
            "Smart Tivi - Android Tivi"
        );
    }

    #[test]
    fn promotions_only_touch_guarded_categories() {
        // Already-specific tivi categories keep their label even when
        // the name carries a keyword.
        assert_eq!(
            reconcile("tivi", "Tivi Cao Cấp", "Smart Tivi 4K"),
            "Tivi Cao Cấp"
        );
    }

    #[test]
    fn pc_mini_promotion_runs_before_the_fallback_replace() {
        assert_eq!(
            reconcile("pc", "Laptop - Máy Vi Tính - Linh kiện", "PC mini Intel NUC"),
            "Mini PC"
        );
        assert_eq!(
            reconcile("pc", "Laptop - Máy Vi Tính - Linh kiện", "PC gaming"),
            "Máy tính đồng bộ"
        );
    }

    #[test]
    fn camera_root_rows_split_on_name_keywords() {
        assert_eq!(
            reconcile("camgiamsat", "Root", "Camera wifi Ezviz"),
            "Camera IP - Camera Wifi"
        );
        assert_eq!(
            reconcile("camgiamsat", "Root", "Chân đế camera"),
            "Phụ Kiện Camera Giám Sát"
        );
    }

    #[test]
    fn maydocsach_tablets_reclassify_by_name_alone() {
        assert_eq!(
            reconcile("maydocsach", "Root", "Máy Tính Bảng đọc sách"),
            "Máy tính bảng"
        );
        assert_eq!(reconcile("maydocsach", "Root", "Kindle Paperwhite"), "Máy đọc sách");
    }
}
