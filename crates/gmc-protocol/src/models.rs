//! Counter model database
//!
//! Maps the version string a unit reports to a static capability profile:
//! which commands the firmware honors, which protocol revision it follows,
//! how wide its heartbeat samples are, and which configuration register map
//! applies. The firmware has no "list capabilities" command, so the version
//! string is the only classification signal available.

use crate::command::CommandKind;
use crate::config::{ConfigLayout, CONFIG_RFC1201, CONFIG_RFC1801};
use crate::error::UnsupportedModel;
use crate::ProtocolRevision;

/// Hardware models with distinct capability sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceModel {
    Gmc300,
    Gmc320,
    Gmc320Plus,
    Gmc500,
    Gmc500Plus,
    Gmc600,
    Gmc600Plus,
}

/// Static protocol profile for one model
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    /// The model this record describes
    pub model: DeviceModel,
    /// Model name as printed on the unit
    pub name: &'static str,
    /// Protocol revision the firmware follows
    pub revision: ProtocolRevision,
    /// Commands this model honors
    pub commands: &'static [CommandKind],
    /// Byte width of one autonomous heartbeat CPS sample
    pub cps_sample_len: usize,
    /// Configuration register map for this model
    pub config_layout: &'static ConfigLayout,
}

impl ModelInfo {
    /// Whether this model honors the given command class
    pub fn supports(&self, kind: CommandKind) -> bool {
        self.commands.contains(&kind)
    }
}

impl DeviceModel {
    /// Static protocol profile for this model
    pub fn info(self) -> &'static ModelInfo {
        match self {
            DeviceModel::Gmc300 => &GMC300,
            DeviceModel::Gmc320 => &GMC320,
            DeviceModel::Gmc320Plus => &GMC320_PLUS,
            DeviceModel::Gmc500 => &GMC500,
            DeviceModel::Gmc500Plus => &GMC500_PLUS,
            DeviceModel::Gmc600 => &GMC600,
            DeviceModel::Gmc600Plus => &GMC600_PLUS,
        }
    }

    /// Model name as printed on the unit
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// All known models
    pub fn all() -> impl Iterator<Item = DeviceModel> {
        MODEL_PATTERNS.iter().map(|(_, model)| *model)
    }
}

impl std::fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a reported version string to a model profile
///
/// Matching is first-match-wins over an ordered substring list: "GMC-500+"
/// is checked before "GMC-500" because the shorter name is a substring of
/// the longer one. Unrecognized strings are an error - there is no default
/// profile to fall back to.
pub fn resolve_model(version: &str) -> Result<&'static ModelInfo, UnsupportedModel> {
    MODEL_PATTERNS
        .iter()
        .find(|(pattern, _)| version.contains(pattern))
        .map(|(_, model)| model.info())
        .ok_or_else(|| UnsupportedModel {
            version: version.to_string(),
        })
}

// Shared command sets

/// Single-tube models without a position sensor
static COMMANDS_BASIC: &[CommandKind] = &[
    CommandKind::Version,
    CommandKind::SerialNumber,
    CommandKind::Voltage,
    CommandKind::Cpm,
    CommandKind::Cps,
    CommandKind::DateTime,
    CommandKind::HeartbeatOn,
    CommandKind::HeartbeatOff,
    CommandKind::Config,
    CommandKind::ReadHistory,
];

/// Models with a position sensor
static COMMANDS_WITH_GYRO: &[CommandKind] = &[
    CommandKind::Version,
    CommandKind::SerialNumber,
    CommandKind::Voltage,
    CommandKind::Cpm,
    CommandKind::Cps,
    CommandKind::Gyro,
    CommandKind::DateTime,
    CommandKind::HeartbeatOn,
    CommandKind::HeartbeatOff,
    CommandKind::Config,
    CommandKind::ReadHistory,
];

/// Dual-tube models reporting per-tube counts
static COMMANDS_DUAL_TUBE: &[CommandKind] = &[
    CommandKind::Version,
    CommandKind::SerialNumber,
    CommandKind::Voltage,
    CommandKind::Cpm,
    CommandKind::Cps,
    CommandKind::CpmHigh,
    CommandKind::CpmLow,
    CommandKind::Gyro,
    CommandKind::DateTime,
    CommandKind::HeartbeatOn,
    CommandKind::HeartbeatOff,
    CommandKind::Config,
    CommandKind::ReadHistory,
];

// Ordered version-string patterns. First match wins, so the "+" variants
// must come before the base names they contain.
static MODEL_PATTERNS: &[(&str, DeviceModel)] = &[
    ("GMC-500+", DeviceModel::Gmc500Plus),
    ("GMC-500", DeviceModel::Gmc500),
    ("GMC-600+", DeviceModel::Gmc600Plus),
    ("GMC-600", DeviceModel::Gmc600),
    ("GMC-320+", DeviceModel::Gmc320Plus),
    ("GMC-320", DeviceModel::Gmc320),
    ("GMC-300", DeviceModel::Gmc300),
];

static GMC300: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc300,
    name: "GMC-300",
    revision: ProtocolRevision::Rfc1201,
    commands: COMMANDS_BASIC,
    cps_sample_len: 2,
    config_layout: &CONFIG_RFC1201,
};

static GMC320: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc320,
    name: "GMC-320",
    revision: ProtocolRevision::Rfc1201,
    commands: COMMANDS_BASIC,
    cps_sample_len: 2,
    config_layout: &CONFIG_RFC1201,
};

static GMC320_PLUS: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc320Plus,
    name: "GMC-320+",
    revision: ProtocolRevision::Rfc1201,
    commands: COMMANDS_WITH_GYRO,
    cps_sample_len: 2,
    config_layout: &CONFIG_RFC1201,
};

static GMC500: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc500,
    name: "GMC-500",
    revision: ProtocolRevision::Rfc1801,
    commands: COMMANDS_WITH_GYRO,
    cps_sample_len: 4,
    config_layout: &CONFIG_RFC1801,
};

static GMC500_PLUS: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc500Plus,
    name: "GMC-500+",
    revision: ProtocolRevision::Rfc1801,
    commands: COMMANDS_DUAL_TUBE,
    cps_sample_len: 4,
    config_layout: &CONFIG_RFC1801,
};

static GMC600: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc600,
    name: "GMC-600",
    revision: ProtocolRevision::Rfc1801,
    commands: COMMANDS_BASIC,
    cps_sample_len: 4,
    config_layout: &CONFIG_RFC1801,
};

static GMC600_PLUS: ModelInfo = ModelInfo {
    model: DeviceModel::Gmc600Plus,
    name: "GMC-600+",
    revision: ProtocolRevision::Rfc1801,
    commands: COMMANDS_BASIC,
    cps_sample_len: 4,
    config_layout: &CONFIG_RFC1801,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_more_specific_pattern() {
        // "GMC-500+Re 2.40" contains both "GMC-500" and "GMC-500+"
        let info = resolve_model("GMC-500+Re 2.40").unwrap();
        assert_eq!(info.model, DeviceModel::Gmc500Plus);
    }

    #[test]
    fn test_resolve_base_models() {
        assert_eq!(
            resolve_model("GMC-500Re 1.08").unwrap().model,
            DeviceModel::Gmc500
        );
        assert_eq!(
            resolve_model("GMC-320Re 4.26").unwrap().model,
            DeviceModel::Gmc320
        );
        assert_eq!(
            resolve_model("GMC-300Re 4.54").unwrap().model,
            DeviceModel::Gmc300
        );
        assert_eq!(
            resolve_model("GMC-600+Re 2.41").unwrap().model,
            DeviceModel::Gmc600Plus
        );
    }

    #[test]
    fn test_resolve_unknown_version_fails() {
        let err = resolve_model("GMC-800Re 1.08").unwrap_err();
        assert_eq!(err.version, "GMC-800Re 1.08");
    }

    #[test]
    fn test_every_model_name_resolves_to_itself() {
        for model in DeviceModel::all() {
            let info = resolve_model(model.name()).unwrap();
            assert_eq!(info.model, model, "name {:?}", model.name());
        }
    }

    #[test]
    fn test_dual_tube_commands_only_on_500_plus() {
        for model in DeviceModel::all() {
            let info = model.info();
            let has_dual = info.supports(CommandKind::CpmHigh) && info.supports(CommandKind::CpmLow);
            assert_eq!(has_dual, model == DeviceModel::Gmc500Plus);
        }
    }

    #[test]
    fn test_gyro_capability() {
        assert!(DeviceModel::Gmc320Plus.info().supports(CommandKind::Gyro));
        assert!(DeviceModel::Gmc500.info().supports(CommandKind::Gyro));
        assert!(!DeviceModel::Gmc300.info().supports(CommandKind::Gyro));
        assert!(!DeviceModel::Gmc600.info().supports(CommandKind::Gyro));
    }

    #[test]
    fn test_heartbeat_width_follows_revision() {
        for model in DeviceModel::all() {
            let info = model.info();
            let expected = match info.revision {
                ProtocolRevision::Rfc1201 => 2,
                ProtocolRevision::Rfc1801 => 4,
            };
            assert_eq!(info.cps_sample_len, expected, "model {:?}", model);
        }
    }

    #[test]
    fn test_config_layout_follows_revision() {
        for model in DeviceModel::all() {
            let info = model.info();
            assert_eq!(info.config_layout.name, info.revision.name());
        }
    }
}
