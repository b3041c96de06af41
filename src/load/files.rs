//! Raw export readers: one CSV per product category plus the matching
//! feedback and manager-response files. Rows that fail to deserialize
//! are logged and skipped; the batch never aborts on a bad row.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::raw::{
    clean_feedback, clean_feedback_responses, clean_products, RawFeedback,
    RawFeedbackRecord, RawFeedbackResponse, RawFeedbackResponseRecord, RawProduct,
    RawProductRecord,
};

/// Source key -> catalog CSV, in the fixed concatenation order.
pub const PRODUCT_FILES: &[(&str, &str)] = &[
    ("dienthoai", "dienthoai.csv"),
    ("mayban", "dienthoaiban.csv"),
    ("cucgach", "dienthoaiphothong.csv"),
    ("dieuhoa", "dieuhoa.csv"),
    ("laptop", "laptop.csv"),
    ("maydocsach", "maydocsach.csv"),
    ("maygiat", "maygiat.csv"),
    ("maytinhbang", "maytinhbang.csv"),
    ("tivi", "tivi.csv"),
    ("tulanh", "tulanh.csv"),
    ("camgiamsat", "cameragiamsat.csv"),
    ("pc", "maytinhdeban.csv"),
    ("mayanh", "mayanh.csv"),
];

pub const FEEDBACK_FILES: &[&str] = &[
    "camera_fb.csv",
    "dienthoai_fb.csv",
    "dienthoaiban_fb.csv",
    "dienthoaiphothong_fb.csv",
    "dieuhoa_fb.csv",
    "laptop_fb.csv",
    "mayanh_fb.csv",
    "maydocsach_fb.csv",
    "maygiat_fb.csv",
    "maytinhbang_fb.csv",
    "tivi_fb.csv",
    "tulanh_fb.csv",
    "maytinhdeban_fb.csv",
];

pub const FEEDBACK_RESPONSE_FILES: &[&str] = &[
    "camera_fb_ma.csv",
    "dienthoai_fb_ma.csv",
    "dienthoaiban_fb_ma.csv",
    "dienthoaiphothong_fb_ma.csv",
    "dieuhoa_fb_ma.csv",
    "laptop_fb_ma.csv",
    "mayanh_fb_ma.csv",
    "maydocsach_fb_ma.csv",
    "maygiat_fb_ma.csv",
    "maytinhbang_fb_ma.csv",
    "maytinhdeban_fb_ma.csv",
    "tivi_fb_ma.csv",
    "tulanh_fb_ma.csv",
];

/// Read one CSV into typed records, tolerating per-row failures. The
/// exports are written with a UTF-8 BOM, which would otherwise glue
/// itself onto the first header name.
fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let headers: StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();
    rdr.set_headers(headers);

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize::<T>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(file = %path.display(), line, error = %err, "skipping unreadable row");
            }
        }
    }
    Ok(records)
}

/// Read and clean every per-category catalog export under
/// `<data_dir>/products/`.
pub fn read_products(data_dir: &Path) -> Result<Vec<(String, Vec<RawProduct>)>> {
    let mut out = Vec::with_capacity(PRODUCT_FILES.len());
    for (source, file) in PRODUCT_FILES {
        let path = data_dir.join("products").join(file);
        let records: Vec<RawProductRecord> = read_records(&path)?;
        let cleaned = clean_products(source, &records);
        info!(source = %source, rows = cleaned.len(), raw = records.len(), "catalog file read");
        out.push(((*source).to_string(), cleaned));
    }
    Ok(out)
}

/// Read and clean every feedback export under `<data_dir>/feedback/`.
pub fn read_feedback(data_dir: &Path) -> Result<Vec<RawFeedback>> {
    let mut records: Vec<RawFeedbackRecord> = Vec::new();
    for file in FEEDBACK_FILES {
        let path = data_dir.join("feedback").join(file);
        records.extend(read_records::<RawFeedbackRecord>(&path)?);
    }
    let cleaned = clean_feedback(&records);
    info!(rows = cleaned.len(), raw = records.len(), "feedback files read");
    Ok(cleaned)
}

/// Read and clean every manager-response export under
/// `<data_dir>/feedback_manager/`.
pub fn read_feedback_responses(data_dir: &Path) -> Result<Vec<RawFeedbackResponse>> {
    let mut records: Vec<RawFeedbackResponseRecord> = Vec::new();
    for file in FEEDBACK_RESPONSE_FILES {
        let path = data_dir.join("feedback_manager").join(file);
        records.extend(read_records::<RawFeedbackResponseRecord>(&path)?);
    }
    let cleaned = clean_feedback_responses(&records);
    info!(rows = cleaned.len(), raw = records.len(), "feedback response files read");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("eshop-etl-test-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("products")).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn bom_on_the_first_header_is_stripped() {
        let path = write_temp(
            "bom.csv",
            "\u{feff}Id,Tên sản phẩm,Thương hiệu,Danh mục,Thông số kỹ thuật,Phiên bản,Mô tả,Hình ảnh\n7,Tivi,LG,Root,spec,100 VND,desc,http://img\n",
        );
        let records: Vec<RawProductRecord> = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("7"));
        assert_eq!(records[0].name.as_deref(), Some("Tivi"));
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let path = write_temp(
            "short.csv",
            "feedback_id,product_id,customer_id,rating,content,variant\n1,2,u1,5,ok,\nbroken\n3,4,u2,4,good,\n",
        );
        let records: Vec<RawFeedbackRecord> = read_records(&path).unwrap();
        // The one-field row deserializes with missing columns as None and
        // is rejected later by validation, or fails outright here; either
        // way the surrounding rows survive.
        assert!(records.len() >= 2);
        let cleaned = clean_feedback(&records);
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn missing_files_surface_their_path() {
        let err = read_records::<RawProductRecord>(Path::new("/nonexistent/x.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/x.csv"));
    }
}
