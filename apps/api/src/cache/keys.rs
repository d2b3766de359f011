//! Deterministic cache keys.
//!
//! Keys are stable across process restarts: they hash a canonical text form of
//! the input with SHA-256 rather than relying on any in-process hasher.

use sha2::{Digest, Sha256};

use crate::models::component::ComponentSpec;

/// `<TypeName>_<hex digest>` over the sorted `name=value` pairs of the spec.
///
/// Field order never matters; two specs of different kinds never collide
/// because the type name is both hashed and prefixed.
pub fn cache_key(spec: &ComponentSpec) -> String {
    let type_name = spec.kind().type_name();

    let mut fields = spec.fields();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Sha256::new();
    hasher.update(type_name.as_bytes());
    for (name, value) in fields {
        // `{:?}` keeps full precision and distinguishes 1.0 from 1.0000001.
        hasher.update(format!("|{name}={value:?}").as_bytes());
    }

    format!("{type_name}_{}", hex::encode(hasher.finalize()))
}

/// `batch_<hex digest>` over the sorted member keys.
///
/// Member order is irrelevant; multiplicity is not, so `[a, a, b]` and `[a, b]`
/// produce different keys.
pub fn batch_key(specs: &[ComponentSpec]) -> String {
    let mut keys: Vec<String> = specs.iter().map(cache_key).collect();
    keys.sort();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
    }

    format!("batch_{}", hex::encode(hasher.finalize()))
}

/// SHA-256 of raw file content, used to key parse results.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tolerances;
    use crate::models::component::ComponentKind;
    use serde_json::{json, Value};

    fn spec(kind: ComponentKind, raw: Value) -> ComponentSpec {
        ComponentSpec::from_json(kind, &raw, &Tolerances::default()).unwrap()
    }

    fn column(width: u32, height: u32) -> ComponentSpec {
        spec(ComponentKind::Column, json!({"width": width, "height": height}))
    }

    #[test]
    fn test_key_is_prefixed_with_type_name() {
        let key = cache_key(&column(300, 300));
        assert!(key.starts_with("Column_"));
        assert_eq!(key.len(), "Column_".len() + 64);
    }

    #[test]
    fn test_key_ignores_json_field_order() {
        let a = spec(ComponentKind::Column, json!({"width": 300, "height": 400}));
        let b = spec(ComponentKind::Column, json!({"height": 400, "width": 300}));
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_integer_and_float_inputs_share_a_key() {
        let a = spec(ComponentKind::Column, json!({"width": 300, "height": 400}));
        let b = spec(ComponentKind::Column, json!({"width": 300.0, "height": 400.0}));
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_different_values_produce_different_keys() {
        assert_ne!(cache_key(&column(300, 400)), cache_key(&column(400, 300)));
    }

    #[test]
    fn test_length_is_part_of_the_ibeam_key() {
        let section = json!({
            "total_depth": 300, "flange_width": 150,
            "web_thickness": 8, "flange_thickness": 12
        });
        let mut long = section.clone();
        long["length"] = json!(6000);
        let a = spec(ComponentKind::IBeam, section);
        let b = spec(ComponentKind::IBeam, long);
        assert!(cache_key(&a).starts_with("IBeam_"));
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_batch_key_ignores_member_order() {
        let forward = vec![column(300, 300), column(400, 400), column(500, 500)];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();
        assert_eq!(batch_key(&forward), batch_key(&reversed));
        assert!(batch_key(&forward).starts_with("batch_"));
    }

    #[test]
    fn test_batch_key_counts_duplicates() {
        let pair = vec![column(300, 300), column(400, 400)];
        let with_dup = vec![column(300, 300), column(300, 300), column(400, 400)];
        assert_ne!(batch_key(&pair), batch_key(&with_dup));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
