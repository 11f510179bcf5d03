#![deny(missing_docs)]
//! # NEO GPS logger
//! Prints fixes from a serial NEO-M8 receiver until interrupted.
mod config;
use chrono::Utc;
use crossterm::terminal;
use neo_gps::{Fix, ModuleSetup, ReceiverSession, SerialTransport};
use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

pub use config::LoggerCfg;

fn main() -> Result<(), Box<dyn Error>> {
    let cfg: LoggerCfg = argh::from_env();

    let log_level = if cfg.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut log_config = simplelog::ConfigBuilder::new();
    log_config.set_time_offset_to_local().ok();
    log_config.set_target_level(log::LevelFilter::Off);
    log_config.set_location_level(log::LevelFilter::Off);
    simplelog::TermLogger::init(
        log_level,
        log_config.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    if let Ok(previous) = LoggerCfg::load_default() {
        if previous != cfg {
            log::debug!("Previous run used {:?}", previous);
        }
    }
    if let Err(e) = cfg.store_default() {
        log::warn!("Could not remember configuration: {e}");
    }
    let session_cfg = cfg.session()?;
    log::trace!("{:#?}", session_cfg);

    let transport = SerialTransport::open(
        &cfg.serial_port,
        cfg.baud_rate,
        Duration::from_millis(cfg.timeout),
    )?;
    let mut session = ReceiverSession::with_config(transport, session_cfg);

    if let Some(baud_rate) = cfg.switch_baud {
        let outcome = session.set_baud_rate(baud_rate)?;
        if !outcome.is_ack() {
            log::error!("Baud rate change to {baud_rate} failed: {outcome:?}");
        }
    }
    if cfg.setup {
        let outcome = session.module_setup(&ModuleSetup::default())?;
        if outcome.is_success() {
            log::info!("Module setup complete");
        }
    }
    if let Some(rate) = cfg.rate {
        let outcome = session.set_rate(rate, cfg.measurements)?;
        log::info!("Output rate {rate} Hz: {outcome:?}");
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    while running.load(Ordering::SeqCst) {
        let fix = session.fix()?;
        if cfg.json {
            println!("{}", serde_json::to_string(&fix)?);
        } else {
            print_fix(&fix);
        }
    }
    log::info!("Stopped");
    Ok(())
}

fn print_fix(fix: &Fix) {
    let width = terminal::size().map(|(w, _)| w).unwrap_or(80) as usize;
    let time = fix
        .time
        .map(|t| t.to_string())
        .unwrap_or_else(|| "--:--:--".into());
    println!(
        "\n{:-<width$}",
        format!("{} [{}] ", Utc::now().format("%Y-%m-%d %H:%M:%S%Z"), time),
        width = width
    );
    match (fix.latitude, fix.longitude) {
        (Some(lat), Some(lon)) => print!("\tPOS {:.6}, {:.6}", lat, lon),
        _ => print!("\tPOS N/A"),
    }
    match fix.altitude {
        Some(alt) => print!(" | ALT {:.1}m", alt),
        None => print!(" | ALT N/A"),
    }
    match fix.position_error {
        Some(err) => print!(" | ±{:.1}m", err),
        None => print!(" | ±N/A"),
    }
    match (fix.horizontal_error, fix.vertical_error) {
        (Some(h), Some(v)) => println!(" (H ±{:.1}m, V ±{:.1}m)", h, v),
        (Some(h), None) => println!(" (H ±{:.1}m)", h),
        (None, Some(v)) => println!(" (V ±{:.1}m)", v),
        (None, None) => println!(),
    }
    match fix.speed_over_ground {
        Some(sog) => print!("\tSOG {:.3}kn", sog),
        None => print!("\tSOG N/A"),
    }
    match fix.course_over_ground {
        Some(cog) => print!(" | COG {:.2}°", cog),
        None => print!(" | COG N/A"),
    }
    if let Some(var) = fix.magnetic_variation {
        print!(" | VAR {:.1}°", var);
    }
    println!();
}
