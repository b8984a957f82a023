//! Camera settings and their sub-command codes.
//!
//! The table is fixed by the camera firmware and never changes at runtime.

use std::fmt;
use std::str::FromStr;

use camwire_frame::{SettingKind, WireType};
use serde::Serialize;

use crate::error::ClientError;

/// A camera setting addressable through the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Setting {
    ExpAuto,
    ExpTime,
    AgainAuto,
    Again,
    StartX,
    StartY,
    Width,
    Height,
    DgainAuto,
    DgainGr,
    DgainB,
    DgainR,
    DgainGb,
    TrigMode,
}

/// One row of the sub-command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubCommand {
    pub setting: Setting,
    pub name: &'static str,
    pub sub_code: u8,
    pub kind: SettingKind,
    pub description: &'static str,
}

/// Sub-command table, indexed by `Setting as usize`.
pub static SUB_COMMANDS: [SubCommand; 14] = [
    row(Setting::ExpAuto, "EXP_AUTO", 0x01, SettingKind::Boolean, "auto exposure"),
    row(Setting::ExpTime, "EXP_TIME", 0x02, SettingKind::Float, "exposure time"),
    row(Setting::AgainAuto, "AGAIN_AUTO", 0x03, SettingKind::Boolean, "auto analog gain"),
    row(Setting::Again, "AGAIN", 0x04, SettingKind::Float, "analog gain"),
    row(Setting::StartX, "START_X", 0x05, SettingKind::Integer, "window start x"),
    row(Setting::StartY, "START_Y", 0x06, SettingKind::Integer, "window start y"),
    row(Setting::Width, "WIDTH", 0x07, SettingKind::Integer, "window width"),
    row(Setting::Height, "HEIGHT", 0x08, SettingKind::Integer, "window height"),
    row(Setting::DgainAuto, "DGAIN_AUTO", 0x09, SettingKind::Boolean, "auto digital gain"),
    row(Setting::DgainGr, "DGAIN_GR", 0x0A, SettingKind::Float, "digital gain, green in red rows"),
    row(Setting::DgainB, "DGAIN_B", 0x0B, SettingKind::Float, "digital gain, blue"),
    row(Setting::DgainR, "DGAIN_R", 0x0C, SettingKind::Float, "digital gain, red"),
    row(Setting::DgainGb, "DGAIN_GB", 0x0D, SettingKind::Float, "digital gain, green in blue rows"),
    row(Setting::TrigMode, "TRIG_MODE", 0x0E, SettingKind::Boolean, "trigger capture mode"),
];

const fn row(
    setting: Setting,
    name: &'static str,
    sub_code: u8,
    kind: SettingKind,
    description: &'static str,
) -> SubCommand {
    SubCommand {
        setting,
        name,
        sub_code,
        kind,
        description,
    }
}

impl Setting {
    pub const ALL: [Setting; 14] = [
        Setting::ExpAuto,
        Setting::ExpTime,
        Setting::AgainAuto,
        Setting::Again,
        Setting::StartX,
        Setting::StartY,
        Setting::Width,
        Setting::Height,
        Setting::DgainAuto,
        Setting::DgainGr,
        Setting::DgainB,
        Setting::DgainR,
        Setting::DgainGb,
        Setting::TrigMode,
    ];

    pub fn entry(self) -> &'static SubCommand {
        &SUB_COMMANDS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn sub_code(self) -> u32 {
        u32::from(self.entry().sub_code)
    }

    pub fn wire_type(self) -> WireType {
        self.entry().kind.wire_type()
    }

    pub fn description(self) -> &'static str {
        self.entry().description
    }

    pub fn from_sub_code(code: u32) -> Option<Self> {
        SUB_COMMANDS
            .iter()
            .find(|entry| u32::from(entry.sub_code) == code)
            .map(|entry| entry.setting)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `EXP_TIME`, `exp_time` or `exp-time`.
impl FromStr for Setting {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        SUB_COMMANDS
            .iter()
            .find(|entry| entry.name == normalized)
            .map(|entry| entry.setting)
            .ok_or_else(|| ClientError::UnknownSetting(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_setting() {
        for setting in Setting::ALL {
            assert_eq!(setting.entry().setting, setting);
        }
    }

    #[test]
    fn sub_codes_are_unique_and_sequential() {
        for (i, entry) in SUB_COMMANDS.iter().enumerate() {
            assert_eq!(usize::from(entry.sub_code), i + 1);
        }
    }

    #[test]
    fn wire_types_follow_kinds() {
        assert_eq!(Setting::ExpAuto.wire_type(), WireType::Bool);
        assert_eq!(Setting::ExpTime.wire_type(), WireType::Float32);
        assert_eq!(Setting::StartY.wire_type(), WireType::Int32);
        assert_eq!(Setting::DgainGb.wire_type(), WireType::Float32);
        assert_eq!(Setting::TrigMode.wire_type(), WireType::Bool);
    }

    #[test]
    fn parse_names() {
        assert_eq!("EXP_TIME".parse::<Setting>().unwrap(), Setting::ExpTime);
        assert_eq!("dgain-gr".parse::<Setting>().unwrap(), Setting::DgainGr);
        assert_eq!("start_x".parse::<Setting>().unwrap(), Setting::StartX);
        assert!(matches!(
            "zoom".parse::<Setting>(),
            Err(ClientError::UnknownSetting(name)) if name == "zoom"
        ));
    }

    #[test]
    fn lookup_by_sub_code() {
        assert_eq!(Setting::from_sub_code(0x0E), Some(Setting::TrigMode));
        assert_eq!(Setting::from_sub_code(0x40), None);
    }
}
