//! Configuration table decoding
//!
//! A counter's settings live in one flat blob fetched with `<GETCFG>>`:
//! 256 bytes on GQ-RFC1201 units, 512 on GQ-RFC1801. The vendor documents
//! the blob as a register map, so decoding is driven by declarative
//! per-revision field tables and a single interpreter instead of
//! hand-written offset math. The tables are read-only static data.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::DecodeError;

/// How one configuration field's bytes decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single literal byte
    Byte,
    /// Big-endian unsigned integer
    UintBe,
    /// Big-endian IEEE 754 single (calibration curve points)
    F32Be,
}

/// One declarative field: where it lives in the blob and how to read it
#[derive(Debug, Clone, Copy)]
pub struct ConfigField {
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    pub kind: FieldKind,
}

/// Blob length plus register map for one protocol revision
#[derive(Debug, Clone, Copy)]
pub struct ConfigLayout {
    /// Vendor document the register map comes from
    pub name: &'static str,
    /// Expected blob length; shorter replies fail up front
    pub blob_len: usize,
    /// Register map
    pub fields: &'static [ConfigField],
}

/// One decoded configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigValue {
    /// Literal byte field
    Byte(u8),
    /// Big-endian unsigned field
    Uint(u64),
    /// Field with no decoder; raw bytes kept for the caller
    Raw(Vec<u8>),
}

/// Fully decoded configuration, rebuilt from scratch on every fetch
pub type ConfigSnapshot = BTreeMap<&'static str, ConfigValue>;

/// Decode a configuration blob against a register map
///
/// The blob length is validated once up front; devices occasionally append
/// trailing bytes, which are ignored. `ConfigField` is publicly
/// constructible, so each descriptor is also validated before its slice is
/// taken: a zero-length field, a `Byte` field wider than one byte, a
/// `UintBe` field wider than a `u64`, or a field reaching past the blob is
/// [`DecodeError::InvalidField`]. A field whose kind has no decoder becomes
/// [`ConfigValue::Raw`] with a warning - one undecodable field must not
/// block access to the rest of the configuration.
pub fn decode_config(blob: &[u8], layout: &ConfigLayout) -> Result<ConfigSnapshot, DecodeError> {
    if blob.is_empty() {
        return Err(DecodeError::EmptyReply);
    }
    if blob.len() < layout.blob_len {
        return Err(DecodeError::LengthMismatch {
            expected: layout.blob_len,
            got: blob.len(),
            raw: blob.to_vec(),
        });
    }

    let mut snapshot = ConfigSnapshot::new();
    for field in layout.fields {
        let invalid = || DecodeError::InvalidField {
            name: field.name,
            offset: field.offset,
            len: field.len,
        };
        if field.len == 0 {
            return Err(invalid());
        }
        let end = field.offset.checked_add(field.len).ok_or_else(invalid)?;
        let raw = blob.get(field.offset..end).ok_or_else(invalid)?;
        let value = match field.kind {
            FieldKind::Byte => {
                if field.len != 1 {
                    return Err(invalid());
                }
                ConfigValue::Byte(raw[0])
            }
            FieldKind::UintBe => {
                if field.len > 8 {
                    return Err(invalid());
                }
                let mut value: u64 = 0;
                for &byte in raw {
                    value = (value << 8) | u64::from(byte);
                }
                ConfigValue::Uint(value)
            }
            kind => {
                warn!(
                    "no decoder for config field {} (kind {:?}), keeping raw bytes",
                    field.name, kind
                );
                ConfigValue::Raw(raw.to_vec())
            }
        };
        snapshot.insert(field.name, value);
    }
    Ok(snapshot)
}

/// Register map for GQ-RFC1201 units (GMC-300/320 family)
pub static CONFIG_RFC1201: ConfigLayout = ConfigLayout {
    name: "GQ-RFC1201",
    blob_len: 256,
    fields: FIELDS_RFC1201,
};

/// Register map for GQ-RFC1801 units (GMC-500/600 family)
pub static CONFIG_RFC1801: ConfigLayout = ConfigLayout {
    name: "GQ-RFC1801",
    blob_len: 512,
    fields: FIELDS_RFC1801,
};

static FIELDS_RFC1201: &[ConfigField] = &[
    ConfigField {
        name: "power",
        offset: 0,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm",
        offset: 1,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "speaker",
        offset: 2,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "graphic_mode",
        offset: 3,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "backlight_timeout_seconds",
        offset: 4,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "idle_title_display_mode",
        offset: 5,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm_cpm",
        offset: 6,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_cpm_1",
        offset: 8,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_1",
        offset: 10,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "calibration_cpm_2",
        offset: 14,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_2",
        offset: 16,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "calibration_cpm_3",
        offset: 20,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_3",
        offset: 22,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "idle_display_mode",
        offset: 26,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm_usv",
        offset: 27,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "alarm_type",
        offset: 31,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "save_data_type",
        offset: 32,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "swivel_display",
        offset: 33,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "zoom",
        offset: 34,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "data_save_address",
        offset: 38,
        len: 3,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "data_read_address",
        offset: 41,
        len: 3,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "power_saving_mode",
        offset: 44,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "max_cpm",
        offset: 49,
        len: 2,
        kind: FieldKind::UintBe,
    },
];

static FIELDS_RFC1801: &[ConfigField] = &[
    ConfigField {
        name: "power",
        offset: 0,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm",
        offset: 1,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "speaker",
        offset: 2,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "backlight_timeout_seconds",
        offset: 4,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm_cpm",
        offset: 6,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_cpm_1",
        offset: 8,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_1",
        offset: 10,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "calibration_cpm_2",
        offset: 14,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_2",
        offset: 16,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "calibration_cpm_3",
        offset: 20,
        len: 2,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "calibration_usv_3",
        offset: 22,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "idle_display_mode",
        offset: 26,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "alarm_usv",
        offset: 27,
        len: 4,
        kind: FieldKind::F32Be,
    },
    ConfigField {
        name: "alarm_type",
        offset: 31,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "save_data_type",
        offset: 32,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "data_save_address",
        offset: 38,
        len: 3,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "data_read_address",
        offset: 41,
        len: 3,
        kind: FieldKind::UintBe,
    },
    ConfigField {
        name: "power_saving_mode",
        offset: 44,
        len: 1,
        kind: FieldKind::Byte,
    },
    ConfigField {
        name: "fast_estimate_time",
        offset: 69,
        len: 1,
        kind: FieldKind::Byte,
    },
];
