//! 协议常量定义
//!
//! 机身 LED 颜色使用 BGR 打包（低字节为红色分量）。

/// LED 关闭
pub const LED_OFF: u32 = 0x00_0000;

/// LED 红色（BGR 打包：低字节）
pub const LED_RED: u32 = 0x00_00FF;

/// LED 绿色
pub const LED_GREEN: u32 = 0x00_FF00;

/// LED 蓝色（BGR 打包：高字节）
pub const LED_BLUE: u32 = 0xFF_0000;

/// 电机通道数量（右轮、左轮、升降臂、头部）
pub const MOTOR_COUNT: usize = 4;

/// 悬崖传感器数量
pub const CLIFF_SENSOR_COUNT: usize = 4;

/// 传输层 LED 数组长度
///
/// 调用方只设置前/中/后三个颜色，第 4 个槽位由前灯颜色填充。
pub const LED_SLOT_COUNT: usize = 4;

/// 每帧麦克风采样数
pub const MIC_SAMPLES_PER_FRAME: usize = 320;

/// 调用方速度单位到传输层单位的比例
pub const MOTOR_SPEED_SCALE: i16 = 100;
