//! 控制指令构建
//!
//! 调用方通过 [`CommandState`] 描述期望的电机速度和 LED 颜色，
//! 命令线程每个周期将其打包为 [`SpineCommand`] 写入传输层。

use crate::constants::{LED_OFF, LED_SLOT_COUNT, MOTOR_COUNT, MOTOR_SPEED_SCALE};
use crate::feedback::MotorIndex;

/// 将调用方的速度单位转换为传输层单位
///
/// 乘以 [`MOTOR_SPEED_SCALE`]，左轮通道取反（安装方向相反）。
/// 不做限幅：超出 `i16` 范围的值按补码回绕，由调用方负责。
pub fn scale_motor_speeds(right: i16, left: i16, lift: i16, head: i16) -> [i16; MOTOR_COUNT] {
    let mut speeds = [right, left, lift, head];
    for (i, speed) in speeds.iter_mut().enumerate() {
        if i == MotorIndex::LeftWheel.as_index() {
            *speed = speed.wrapping_neg();
        }
        *speed = speed.wrapping_mul(MOTOR_SPEED_SCALE);
    }
    speeds
}

/// 期望的执行器状态
///
/// 电机速度已是传输层单位（见 [`scale_motor_speeds`]），LED 顺序为前、中、后。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandState {
    pub motors: [i16; MOTOR_COUNT],
    pub front_led: u32,
    pub middle_led: u32,
    pub back_led: u32,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            motors: [0; MOTOR_COUNT],
            front_led: LED_OFF,
            middle_led: LED_OFF,
            back_led: LED_OFF,
        }
    }
}

impl CommandState {
    /// 按通道名读取已缩放的电机速度
    pub fn motor(&self, motor: MotorIndex) -> i16 {
        self.motors[motor.as_index()]
    }

    /// 传输层的 LED 数组：后、中、前、前
    pub fn led_slots(&self) -> [u32; LED_SLOT_COUNT] {
        [self.back_led, self.middle_led, self.front_led, self.front_led]
    }

    /// 打包为一次传输层写入
    pub fn to_command(&self, seq: u32) -> SpineCommand {
        SpineCommand {
            seq,
            motors: self.motors,
            leds: self.led_slots(),
        }
    }
}

/// 单次写入传输层的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpineCommand {
    pub seq: u32,
    pub motors: [i16; MOTOR_COUNT],
    pub leds: [u32; LED_SLOT_COUNT],
}
