use crate::core::types::RawAlert;

/// Legacy/alternate key names rewritten before any further processing.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("source_ip", "srcip"),
    ("src_ip", "srcip"),
    ("destination_ip", "dstip"),
    ("dest_ip", "dstip"),
];

/// Rewrites aliased field names to their canonical raw form. Unrecognized
/// keys pass through unchanged.
#[derive(Debug, Default)]
pub struct FieldNormalizer;

impl FieldNormalizer {
    pub fn new() -> Self {
        FieldNormalizer
    }

    pub fn normalize(&self, raw: &RawAlert) -> RawAlert {
        let mut normalized = raw.clone();
        for (alias, canonical) in FIELD_ALIASES {
            if let Some(value) = normalized.remove(*alias) {
                normalized.insert((*canonical).to_string(), value);
            }
        }
        normalized
    }
}
