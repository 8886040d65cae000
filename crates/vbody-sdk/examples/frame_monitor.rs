//! 机身帧监控工具
//!
//! 此示例演示 `Spine` 会话的完整用法：初始化、订阅帧和按键事件、下发 LED 指令、优雅退出。
//! 使用 MockTransport 模拟机身链路，无需硬件即可运行。
//!
//! 特点：
//! - 按固定间隔打印最新帧（电池、触摸、悬崖传感器）
//! - 按键按下时 LED 变绿，松开时变红
//! - 支持 Ctrl+C 优雅退出
//!
//! 使用方式：
//! ```bash
//! cargo run -p vbody-sdk --example frame_monitor
//!
//! # 只读模式，打印间隔 200ms
//! cargo run -p vbody-sdk --example frame_monitor -- --read-only --interval-ms 200
//!
//! # 从 TOML 文件加载会话配置
//! cargo run -p vbody-sdk --example frame_monitor -- --config spine.toml
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use vbody_sdk::prelude::*;
use vbody_sdk::protocol::RawDataFrame;
use vbody_sdk::spine::MockTransport;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "frame_monitor")]
#[command(about = "机身帧监控工具")]
struct Args {
    /// 只读模式（不下发任何指令）
    #[arg(long)]
    read_only: bool,

    /// 打印间隔（毫秒）
    #[arg(long, default_value = "500")]
    interval_ms: u64,

    /// 会话配置文件（TOML）
    #[arg(long)]
    config: Option<PathBuf>,
}

/// 模拟一段按键按下的脚本
fn scripted_transport() -> MockTransport {
    let mock = MockTransport::new().with_idle_frame(RawDataFrame {
        touch_sensor: 300,
        battery_voltage: 3900,
        cliff_sensor: [800, 810, 790, 805],
        ..Default::default()
    });
    for i in 0..400u16 {
        mock.push_frame(RawDataFrame {
            seq: u32::from(i) + 1,
            touch_sensor: 300,
            battery_voltage: 3900,
            button_state: u16::from((100..300).contains(&i)),
            ..Default::default()
        });
    }
    mock
}

fn print_frame(frame: &DataFrame) {
    println!(
        "seq {:>6} | batt {:>5} | touch {:>5} | cliffs {:?} | button {}",
        frame.seq,
        frame.batt_voltage,
        frame.touch,
        frame.cliffs,
        if frame.button_state { "down" } else { "up" }
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    vbody_sdk::init_logger();
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        println!("\n收到退出信号，正在关闭...");
    })?;

    let mut builder = SpineBuilder::new();
    if let Some(path) = &args.config {
        builder = builder.config_file(path)?;
    }
    let spine = builder.read_only(args.read_only).build(scripted_transport())?;

    println!("正在初始化链路...");
    spine.init()?;
    println!("✅ 链路已就绪");

    let frames = spine.frames()?;
    let buttons = spine.buttons()?;
    let faults = spine.faults()?;
    let interval = Duration::from_millis(args.interval_ms);

    while running.load(Ordering::SeqCst) {
        if let Ok(fault) = faults.try_recv() {
            eprintln!("❌ {}", fault);
            break;
        }

        if let Ok(event) = buttons.try_recv() {
            println!("按键: {:?}", event);
            if !args.read_only {
                let color = if event.is_pressed() { LED_GREEN } else { LED_RED };
                spine.set_led_command(color, color, color)?;
            }
        }

        match frames.recv_timeout(interval) {
            Ok(frame) => print_frame(&frame),
            Err(_) => println!("⚠️ {:?} 内未收到帧", interval),
        }
        std::thread::sleep(interval);
    }

    spine.stop();
    let metrics = spine.metrics();
    println!(
        "读取 {} 帧，转发 {}，丢弃 {}，覆盖率 {:.1}%",
        metrics.rx_frames_total,
        metrics.rx_frames_forwarded,
        metrics.rx_frames_discarded,
        metrics.overwrite_rate()
    );
    Ok(())
}
