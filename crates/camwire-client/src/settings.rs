use camwire_frame::{Value, GET, SET};
use serde::Serialize;
use tracing::debug;

use crate::command::CommandChannel;
use crate::config::CommandConfig;
use crate::error::{ClientError, Result};
use crate::table::Setting;

/// How the sensor captures frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Free-running capture.
    Continuous,
    /// One frame per external trigger.
    Triggered,
}

impl CaptureMode {
    fn from_flag(triggered: bool) -> Self {
        if triggered {
            CaptureMode::Triggered
        } else {
            CaptureMode::Continuous
        }
    }

    fn flag(self) -> bool {
        self == CaptureMode::Triggered
    }
}

/// Sensor readout window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldOfView {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Per-channel digital gain of the Bayer pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DigitalGain {
    pub gr: f32,
    pub gb: f32,
    pub r: f32,
    pub b: f32,
}

macro_rules! typed_setting {
    ($get:ident, $set:ident, $setting:expr, $ty:ty, $variant:ident, $extract:ident $(,)?) => {
        pub fn $get(&mut self) -> Result<$ty> {
            self.get_typed($setting, Value::$extract)
        }

        pub fn $set(&mut self, value: $ty, commit: bool) -> Result<()> {
            self.set($setting, Value::$variant(value), commit)
        }
    };
}

/// Typed access to the camera's sensor settings.
///
/// Every call connects the command channel first if it is down, so a call
/// that follows a failed one starts on a fresh socket.
pub struct SensorSettings {
    channel: CommandChannel,
}

impl SensorSettings {
    pub fn new(addr: impl Into<String>, config: CommandConfig) -> Self {
        Self::from_channel(CommandChannel::new(addr, config))
    }

    pub fn from_channel(channel: CommandChannel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Close the command socket. The next call reconnects.
    pub fn disconnect(&mut self) {
        self.channel.close();
    }

    fn with_connection<T>(
        &mut self,
        op: impl FnOnce(&mut CommandChannel) -> Result<T>,
    ) -> Result<T> {
        if !self.channel.is_connected() {
            debug!(addr = self.channel.address(), "connecting command channel");
            self.channel.connect()?;
        }
        op(&mut self.channel)
    }

    /// Read a setting. `None` when the device answers with an empty reply.
    pub fn get(&mut self, setting: Setting) -> Result<Option<Value>> {
        let wire = setting.wire_type();
        let sub_command = setting.sub_code();
        self.with_connection(|channel| {
            channel.send_command(GET, sub_command, wire, &Value::placeholder(wire), false)
        })
    }

    /// Write a setting, committing the pending batch when `commit` is set.
    pub fn set(&mut self, setting: Setting, value: Value, commit: bool) -> Result<()> {
        let wire = setting.wire_type();
        let sub_command = setting.sub_code();
        self.with_connection(|channel| {
            channel.send_command(SET, sub_command, wire, &value, commit)
        })?;
        Ok(())
    }

    /// Read every setting in table order.
    pub fn snapshot(&mut self) -> Result<Vec<(Setting, Option<Value>)>> {
        Setting::ALL
            .into_iter()
            .map(|setting| Ok((setting, self.get(setting)?)))
            .collect()
    }

    typed_setting!(get_auto_exposure, set_auto_exposure, Setting::ExpAuto, bool, Bool, as_bool);
    typed_setting!(get_exposure_time, set_exposure_time, Setting::ExpTime, f32, Float32, as_f32);
    typed_setting!(
        get_auto_analog_gain,
        set_auto_analog_gain,
        Setting::AgainAuto,
        bool,
        Bool,
        as_bool,
    );
    typed_setting!(get_analog_gain, set_analog_gain, Setting::Again, f32, Float32, as_f32);
    typed_setting!(get_start_x, set_start_x, Setting::StartX, i32, Int32, as_i32);
    typed_setting!(get_start_y, set_start_y, Setting::StartY, i32, Int32, as_i32);
    typed_setting!(get_width, set_width, Setting::Width, i32, Int32, as_i32);
    typed_setting!(get_height, set_height, Setting::Height, i32, Int32, as_i32);
    typed_setting!(
        get_auto_digital_gain,
        set_auto_digital_gain,
        Setting::DgainAuto,
        bool,
        Bool,
        as_bool,
    );
    typed_setting!(
        get_digital_gain_gr,
        set_digital_gain_gr,
        Setting::DgainGr,
        f32,
        Float32,
        as_f32,
    );
    typed_setting!(
        get_digital_gain_gb,
        set_digital_gain_gb,
        Setting::DgainGb,
        f32,
        Float32,
        as_f32,
    );
    typed_setting!(get_digital_gain_r, set_digital_gain_r, Setting::DgainR, f32, Float32, as_f32);
    typed_setting!(get_digital_gain_b, set_digital_gain_b, Setting::DgainB, f32, Float32, as_f32);

    pub fn get_capture_mode(&mut self) -> Result<CaptureMode> {
        self.get_typed(Setting::TrigMode, Value::as_bool)
            .map(CaptureMode::from_flag)
    }

    pub fn set_capture_mode(&mut self, mode: CaptureMode, commit: bool) -> Result<()> {
        self.set(Setting::TrigMode, Value::Bool(mode.flag()), commit)
    }

    /// Set the readout window in four commands, committing only after the last.
    ///
    /// Stops at the first failure; nothing after it is sent and no commit
    /// happens, so the device keeps its uncommitted batch.
    pub fn set_field_of_view(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        commit: bool,
    ) -> Result<()> {
        self.set_batch(
            [
                (Setting::StartX, Value::Int32(x)),
                (Setting::StartY, Value::Int32(y)),
                (Setting::Width, Value::Int32(width)),
                (Setting::Height, Value::Int32(height)),
            ],
            commit,
        )
    }

    pub fn get_field_of_view(&mut self) -> Result<FieldOfView> {
        Ok(FieldOfView {
            x: self.get_start_x()?,
            y: self.get_start_y()?,
            width: self.get_width()?,
            height: self.get_height()?,
        })
    }

    /// Set all four digital gains (GR, GB, R, B), committing only after the
    /// last. Same failure semantics as [`Self::set_field_of_view`].
    pub fn set_digital_gain(
        &mut self,
        gr: f32,
        gb: f32,
        r: f32,
        b: f32,
        commit: bool,
    ) -> Result<()> {
        self.set_batch(
            [
                (Setting::DgainGr, Value::Float32(gr)),
                (Setting::DgainGb, Value::Float32(gb)),
                (Setting::DgainR, Value::Float32(r)),
                (Setting::DgainB, Value::Float32(b)),
            ],
            commit,
        )
    }

    pub fn get_digital_gain(&mut self) -> Result<DigitalGain> {
        Ok(DigitalGain {
            gr: self.get_digital_gain_gr()?,
            gb: self.get_digital_gain_gb()?,
            r: self.get_digital_gain_r()?,
            b: self.get_digital_gain_b()?,
        })
    }

    fn set_batch<const N: usize>(
        &mut self,
        writes: [(Setting, Value); N],
        commit: bool,
    ) -> Result<()> {
        for (i, (setting, value)) in writes.into_iter().enumerate() {
            self.set(setting, value, commit && i + 1 == N)?;
        }
        Ok(())
    }

    fn get_typed<T>(&mut self, setting: Setting, extract: fn(&Value) -> Option<T>) -> Result<T> {
        match self.get(setting)? {
            Some(value) => extract(&value).ok_or_else(|| ClientError::UnexpectedReply {
                setting: setting.name(),
                detail: format!("{} value {value}", value.wire_type()),
            }),
            None => Err(ClientError::UnexpectedReply {
                setting: setting.name(),
                detail: "empty reply".to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for SensorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSettings")
            .field("addr", &self.channel.address())
            .field("connected", &self.channel.is_connected())
            .finish()
    }
}
