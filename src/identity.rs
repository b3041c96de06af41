//! Content-addressed identity: every output entity's primary key is a
//! SHA-256 digest over its canonical field tuple, so two logically
//! identical rows hash to the same id no matter which run or source
//! file produced them. The store-side merge relies on this to skip rows
//! whose id already exists.

use sha2::{Digest, Sha256};

/// Separator between canonicalized field values. A single fixed byte
/// keeps the encoding unambiguous as long as no renderer emits it,
/// which the fixed-precision/plain renderers below never do for the
/// numeric fields and which text fields may — acceptable because the
/// field ORDER is also fixed, so a stray separator cannot reorder
/// fields between two encodings of the same tuple.
const SEPARATOR: char = '|';

/// Ordered field tuple accumulated before digesting.
///
/// Field names are part of the declared schema of each entity and serve
/// as in-code documentation of the hash layout; only the rendered
/// values and their order enter the digest.
#[derive(Debug, Default, Clone)]
pub struct FieldTuple {
    parts: Vec<String>,
}

impl FieldTuple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, _name: &'static str, value: &str) -> Self {
        self.parts.push(value.to_string());
        self
    }

    /// Missing values canonicalize to the empty string.
    pub fn opt_text(self, name: &'static str, value: Option<&str>) -> Self {
        self.text(name, value.unwrap_or(""))
    }

    pub fn int(mut self, _name: &'static str, value: i64) -> Self {
        self.parts.push(value.to_string());
        self
    }

    /// Floats render with fixed 6-decimal precision so the digest never
    /// depends on platform float-to-string behavior.
    pub fn float(mut self, _name: &'static str, value: f64) -> Self {
        self.parts.push(format!("{value:.6}"));
        self
    }

    pub fn opt_float(mut self, _name: &'static str, value: Option<f64>) -> Self {
        let rendered = match value {
            Some(v) => format!("{v:.6}"),
            None => String::new(),
        };
        self.parts.push(rendered);
        self
    }

    /// Lower-case hex SHA-256 of the joined tuple.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                hasher.update([SEPARATOR as u8]);
            }
            hasher.update(part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_tuples_digest_identically() {
        let a = FieldTuple::new()
            .text("name", "Tivi OLED")
            .int("stock", 42)
            .float("price", 1999.5)
            .digest();
        let b = FieldTuple::new()
            .text("name", "Tivi OLED")
            .int("stock", 42)
            .float("price", 1999.5)
            .digest();
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_change_changes_the_digest() {
        let base = FieldTuple::new().text("name", "a").int("n", 1).digest();
        assert_ne!(base, FieldTuple::new().text("name", "b").int("n", 1).digest());
        assert_ne!(base, FieldTuple::new().text("name", "a").int("n", 2).digest());
    }

    #[test]
    fn missing_values_render_as_empty() {
        let explicit = FieldTuple::new()
            .text("a", "x")
            .text("b", "")
            .digest();
        let missing = FieldTuple::new()
            .text("a", "x")
            .opt_text("b", None)
            .digest();
        assert_eq!(explicit, missing);
    }

    #[test]
    fn float_rendering_is_fixed_precision() {
        let a = FieldTuple::new().float("v", 0.1 + 0.2).digest();
        let b = FieldTuple::new().float("v", 0.3).digest();
        // 0.1 + 0.2 != 0.3 in f64, but both render as "0.300000".
        assert_eq!(a, b);
        assert_eq!(
            FieldTuple::new().opt_float("v", Some(0.3)).digest(),
            FieldTuple::new().float("v", 0.3).digest()
        );
    }

    #[test]
    fn digest_is_hex_encoded_sha256() {
        let id = FieldTuple::new().text("name", "x").digest();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
