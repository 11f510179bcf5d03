use std::path::{Path, PathBuf};

use argh::FromArgs;
use directories::ProjectDirs;
use neo_gps::SessionConfig;
use serde::{Deserialize, Serialize};

#[derive(FromArgs, Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Log fixes from a NEO-M8 receiver
pub struct LoggerCfg {
    /// serial device
    #[argh(positional)]
    pub serial_port: String,
    /// baud rate the receiver currently uses
    #[argh(option, default = "9600")]
    pub baud_rate: u32,
    /// serial read timeout in milliseconds
    #[argh(option, default = "100")]
    pub timeout: u64,
    /// navigation output rate in Hz, up to 10
    #[argh(option)]
    pub rate: Option<f64>,
    /// measurements per navigation solution
    #[argh(option, default = "1")]
    pub measurements: u16,
    /// run the full module setup and save it to flash
    #[argh(switch)]
    pub setup: bool,
    /// switch the receiver to this baud rate after connecting
    #[argh(option)]
    pub switch_baud: Option<u32>,
    /// print fixes as JSON lines
    #[argh(switch)]
    pub json: bool,
    /// JSON5 file with session settings
    #[argh(option)]
    pub session_config: Option<PathBuf>,
    /// verbose logging
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}

impl LoggerCfg {
    /// Store the configuration in the default location
    pub fn store_default(&self) -> Result<(), std::io::Error> {
        let path = get_default_path();
        std::fs::create_dir_all(&path)?;
        self.store(path.join("config.json"))
    }

    /// Load the configuration from the default location
    pub fn load_default() -> Result<Self, std::io::Error> {
        Self::load(get_default_path().join("config.json"))
    }

    /// Store the configuration as JSON
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        std::fs::write(
            path,
            serde_json::to_string(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?,
        )
    }

    /// Load a configuration stored with [`store`](Self::store)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Session settings from the JSON5 file, or defaults when none is given
    pub fn session(&self) -> Result<SessionConfig, std::io::Error> {
        match &self.session_config {
            Some(path) => load_session_config(path),
            None => Ok(SessionConfig::default()),
        }
    }
}

/// Read session settings; missing keys keep their default
pub fn load_session_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig, std::io::Error> {
    let data = std::fs::read_to_string(path)?;
    json5::from_str(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn get_default_path() -> PathBuf {
    if let Some(path) = ProjectDirs::from("", "", "neo_gps_logger") {
        path.config_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> LoggerCfg {
        LoggerCfg::from_args(&["neo-gps-logger"], &["/dev/ttyS0", "--rate", "4", "--json"])
            .unwrap()
    }

    #[test]
    fn cli_defaults() {
        let cfg = cfg();
        assert_eq!(cfg.serial_port, "/dev/ttyS0");
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.rate, Some(4.0));
        assert_eq!(cfg.measurements, 1);
        assert!(cfg.json);
        assert!(!cfg.setup);
        assert_eq!(cfg.switch_baud, None);
    }

    #[test]
    fn store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = cfg();
        cfg.store(&path).unwrap();
        assert_eq!(LoggerCfg::load(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_session_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json5");
        std::fs::write(
            &path,
            "{\n  // slower receivers\n  ack_timeout_ms: 2500,\n  error_model: { vertical_accuracy: 5.0 },\n}",
        )
        .unwrap();
        let session = load_session_config(&path).unwrap();
        assert_eq!(session.ack_timeout_ms, 2500);
        assert_eq!(session.error_model.vertical_accuracy, 5.0);
        assert_eq!(session.error_model.horizontal_accuracy, 2.5);
        assert_eq!(session.sentences_per_update, 5);
    }

    #[test]
    fn malformed_session_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json5");
        std::fs::write(&path, "{ ack_timeout_ms: ").unwrap();
        let err = load_session_config(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
