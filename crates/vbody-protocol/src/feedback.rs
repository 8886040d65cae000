//! 反馈帧解析
//!
//! `RawDataFrame` 是传输层交给本 crate 的原始读取结果（字段宽度与机身固件一致），
//! `DataFrame` 是解码后的语义化快照。两者之间的映射由 [`decode_frame`] 完成，
//! 只做宽度转换和重排，不做任何过滤或派生计算。

use crate::ProtocolError;
use crate::constants::{CLIFF_SENSOR_COUNT, MIC_SAMPLES_PER_FRAME, MOTOR_COUNT};

/// 原始电机状态（单个通道）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMotorStatus {
    /// 编码器位置
    pub pos: i32,
    /// 相对上一帧的位置增量
    pub dlt: i32,
    /// 采样时间戳
    pub tm: u32,
}

/// 原始数据帧
///
/// 每次 `read_frame` 返回一个实例。部分字段（`status`、I2C 故障、电池标志等）
/// 由固件提供但不进入 [`DataFrame`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataFrame {
    pub seq: u32,
    pub status: u16,
    pub i2c_device_fault: u8,
    pub i2c_fault_item: u8,
    /// 顺序固定：右轮、左轮、升降臂、头部
    pub motors: [RawMotorStatus; MOTOR_COUNT],
    pub cliff_sensor: [u16; CLIFF_SENSOR_COUNT],
    pub battery_voltage: i16,
    pub charger_voltage: i16,
    pub body_temp: i16,
    pub battery_flags: u16,
    pub prox_sigma_mm: u8,
    pub prox_raw_range_mm: u16,
    pub prox_signal_rate_mcps: u16,
    pub prox_ambient: u16,
    pub prox_spad_count: u16,
    pub prox_sample_count: u16,
    pub prox_calibration_result: u32,
    pub touch_sensor: u16,
    /// 非零表示按下
    pub button_state: u16,
    pub mic_indices: u32,
    pub button_inputs: u16,
    pub mic_data: [u16; MIC_SAMPLES_PER_FRAME],
}

impl Default for RawDataFrame {
    fn default() -> Self {
        Self {
            seq: 0,
            status: 0,
            i2c_device_fault: 0,
            i2c_fault_item: 0,
            motors: [RawMotorStatus::default(); MOTOR_COUNT],
            cliff_sensor: [0; CLIFF_SENSOR_COUNT],
            battery_voltage: 0,
            charger_voltage: 0,
            body_temp: 0,
            battery_flags: 0,
            prox_sigma_mm: 0,
            prox_raw_range_mm: 0,
            prox_signal_rate_mcps: 0,
            prox_ambient: 0,
            prox_spad_count: 0,
            prox_sample_count: 0,
            prox_calibration_result: 0,
            touch_sensor: 0,
            button_state: 0,
            mic_indices: 0,
            button_inputs: 0,
            mic_data: [0; MIC_SAMPLES_PER_FRAME],
        }
    }
}

impl RawDataFrame {
    /// 用给定的麦克风采样块替换 `mic_data`
    ///
    /// # 错误
    /// - `ProtocolError::InvalidLength`: 采样数不等于 [`MIC_SAMPLES_PER_FRAME`]
    pub fn with_mic_samples(mut self, samples: &[u16]) -> Result<Self, ProtocolError> {
        if samples.len() != MIC_SAMPLES_PER_FRAME {
            return Err(ProtocolError::InvalidLength {
                expected: MIC_SAMPLES_PER_FRAME,
                actual: samples.len(),
            });
        }
        self.mic_data.copy_from_slice(samples);
        Ok(self)
    }
}

/// 电机通道索引
///
/// 与 [`DataFrame::encoders`] 的下标一一对应，顺序不可更改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MotorIndex {
    RightWheel = 0,
    LeftWheel = 1,
    Lift = 2,
    Head = 3,
}

impl MotorIndex {
    pub const ALL: [MotorIndex; MOTOR_COUNT] = [
        MotorIndex::RightWheel,
        MotorIndex::LeftWheel,
        MotorIndex::Lift,
        MotorIndex::Head,
    ];

    pub fn as_index(self) -> usize {
        self as usize
    }
}

/// 解码后的电机状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorStatus {
    pub pos: i32,
    pub dlt: i32,
    pub tm: u32,
}

/// 解码后的数据帧
///
/// 解码后不可变；扇出时以值的形式在各输出槽之间克隆。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataFrame {
    pub seq: u32,
    pub cliffs: [u32; CLIFF_SENSOR_COUNT],
    /// 右轮、左轮、升降臂、头部
    pub encoders: [MotorStatus; MOTOR_COUNT],
    pub batt_voltage: i16,
    pub charger_voltage: i16,
    pub body_temp: i16,
    pub touch: u16,
    pub button_state: bool,
    pub mic_data: Vec<i16>,
    pub prox_sigma_mm: u8,
    pub prox_raw_range_mm: u16,
    pub prox_signal_rate_mcps: u16,
    pub prox_ambient: u16,
    pub prox_spad_count: u16,
    pub prox_sample_count: u16,
    pub prox_calib_result: u32,
}

impl DataFrame {
    /// 按通道名取编码器状态
    pub fn encoder(&self, motor: MotorIndex) -> MotorStatus {
        self.encoders[motor.as_index()]
    }
}

impl From<&RawDataFrame> for DataFrame {
    fn from(raw: &RawDataFrame) -> Self {
        decode_frame(raw)
    }
}

/// 将一帧原始数据解码为 [`DataFrame`]
///
/// 纯函数：相同输入总是得到相同输出。麦克风采样按位重新解释为 `i16`。
pub fn decode_frame(raw: &RawDataFrame) -> DataFrame {
    let encoders = raw.motors.map(|m| MotorStatus {
        pos: m.pos,
        dlt: m.dlt,
        tm: m.tm,
    });

    DataFrame {
        seq: raw.seq,
        cliffs: raw.cliff_sensor.map(u32::from),
        encoders,
        batt_voltage: raw.battery_voltage,
        charger_voltage: raw.charger_voltage,
        body_temp: raw.body_temp,
        touch: raw.touch_sensor,
        button_state: raw.button_state != 0,
        mic_data: raw.mic_data.iter().map(|&s| s as i16).collect(),
        prox_sigma_mm: raw.prox_sigma_mm,
        prox_raw_range_mm: raw.prox_raw_range_mm,
        prox_signal_rate_mcps: raw.prox_signal_rate_mcps,
        prox_ambient: raw.prox_ambient,
        prox_spad_count: raw.prox_spad_count,
        prox_sample_count: raw.prox_sample_count,
        prox_calib_result: raw.prox_calibration_result,
    }
}
