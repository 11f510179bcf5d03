//! UBX configuration packet factory.
//!
//! Every command is a plain value; turning it into bytes has no side effect.
use bitfield_struct::bitfield;

use crate::checksum::ubx_checksum;

/// UBX sync characters
pub const SYNC: [u8; 2] = [0xB5, 0x62];
/// Configuration class
pub const CLASS_CFG: u8 = 0x06;
/// Standard NMEA message class, used by CFG-MSG
pub const CLASS_NMEA: u8 = 0xF0;
/// NMEA VTG message id
pub const NMEA_VTG: u8 = 0x05;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A framed UBX command: sync, class, id, length, payload, checksum.
pub struct CommandPacket {
    class: u8,
    id: u8,
    payload: Vec<u8>,
}

impl CommandPacket {
    /// Wrap a payload for a class/id pair
    pub fn new(class: u8, id: u8, payload: Vec<u8>) -> Self {
        Self { class, id, payload }
    }

    /// Message class
    pub fn class(&self) -> u8 {
        self.class
    }

    /// Message id
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Wire representation, ready to be written to the receiver.
    ///
    /// The checksum covers class, id, length and payload but not the sync bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 8);
        out.extend_from_slice(&SYNC);
        out.push(self.class);
        out.push(self.id);
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.payload);
        let (ck_a, ck_b) = ubx_checksum(&out[2..]);
        out.push(ck_a);
        out.push(ck_b);
        out
    }
}

/// A configuration message with a fixed class and id.
pub trait UbxCommand {
    /// Message class
    const CLASS: u8;
    /// Message id
    const ID: u8;

    /// Little-endian payload
    fn payload(&self) -> Vec<u8>;

    /// Frame the payload
    fn to_packet(&self) -> CommandPacket {
        CommandPacket::new(Self::CLASS, Self::ID, self.payload())
    }
}

/// Measurement interval for an output rate, truncated to whole milliseconds
pub fn measurement_interval_ms(rate_hz: f64) -> u16 {
    (1000.0 / rate_hz) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
/// Clock the measurement grid is aligned to
pub enum TimeRef {
    /// UTC
    Utc = 0,
    /// GPS time
    Gps = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-RATE: navigation solution rate
pub struct CfgRate {
    /// Milliseconds between measurements
    pub measure_rate_ms: u16,
    /// Measurements per navigation solution
    pub nav_rate: u16,
    /// Alignment clock
    pub time_ref: TimeRef,
}

impl CfgRate {
    /// Rate for an output frequency in Hz
    pub fn from_hz(rate_hz: f64, measurements_per_solution: u16) -> Self {
        Self {
            measure_rate_ms: measurement_interval_ms(rate_hz),
            nav_rate: measurements_per_solution,
            time_ref: TimeRef::Utc,
        }
    }
}

impl UbxCommand for CfgRate {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x08;

    fn payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(6);
        p.extend_from_slice(&self.measure_rate_ms.to_le_bytes());
        p.extend_from_slice(&self.nav_rate.to_le_bytes());
        p.extend_from_slice(&(self.time_ref as u16).to_le_bytes());
        p
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// UBX-CFG-RST reset modes used by this driver
pub enum ResetMode {
    /// Hardware reset through the watchdog
    Hardware = 0x00,
    /// Software reset
    Software = 0x01,
    /// Stop GNSS processing, keep the receiver powered
    GnssStop = 0x08,
    /// Resume GNSS processing
    GnssStart = 0x09,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-RST. The receiver never acknowledges it.
pub struct CfgRst {
    /// Battery backed RAM sections to clear, 0 for a hot start
    pub nav_bbr_mask: u16,
    /// What to reset
    pub reset_mode: ResetMode,
}

impl CfgRst {
    /// Hot stop of GNSS processing
    pub fn gnss_stop() -> Self {
        Self {
            nav_bbr_mask: 0,
            reset_mode: ResetMode::GnssStop,
        }
    }

    /// Hot start of GNSS processing
    pub fn gnss_start() -> Self {
        Self {
            nav_bbr_mask: 0,
            reset_mode: ResetMode::GnssStart,
        }
    }
}

impl UbxCommand for CfgRst {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x04;

    fn payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(4);
        p.extend_from_slice(&self.nav_bbr_mask.to_le_bytes());
        p.push(self.reset_mode as u8);
        p.push(0);
        p
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-MSG: output rate of one message on the current port
pub struct CfgMsg {
    /// Class of the message to configure
    pub msg_class: u8,
    /// Id of the message to configure
    pub msg_id: u8,
    /// Output every `rate` solutions, 0 disables it
    pub rate: u8,
}

impl CfgMsg {
    /// Stop an NMEA sentence from being emitted
    pub fn disable_nmea(msg_id: u8) -> Self {
        Self {
            msg_class: CLASS_NMEA,
            msg_id,
            rate: 0,
        }
    }
}

impl UbxCommand for CfgMsg {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x01;

    fn payload(&self) -> Vec<u8> {
        vec![self.msg_class, self.msg_id, self.rate]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Platform model assumed by the navigation filter
pub enum DynamicModel {
    /// Portable
    Portable = 0,
    /// Stationary
    Stationary = 2,
    /// Pedestrian
    Pedestrian = 3,
    /// Automotive
    Automotive = 4,
    /// Sea
    Sea = 5,
    /// Airborne, below 1 g
    Airborne1g = 6,
    /// Airborne, below 2 g
    Airborne2g = 7,
    /// Airborne, below 4 g
    Airborne4g = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Which fixes the receiver may output
pub enum FixMode {
    /// 2D only
    Only2d = 1,
    /// 3D only
    Only3d = 2,
    /// 2D or 3D
    Auto = 3,
}

const NAV5_MASK_DYN: u16 = 1 << 0;
const NAV5_MASK_MIN_EL: u16 = 1 << 1;
const NAV5_MASK_FIX_MODE: u16 = 1 << 2;
const NAV5_MASK_STATIC_HOLD: u16 = 1 << 6;
const NAV5_MASK_UTC: u16 = 1 << 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-NAV5: navigation engine settings
pub struct CfgNav5 {
    /// Platform model
    pub dynamic_model: DynamicModel,
    /// Allowed fix types
    pub fix_mode: FixMode,
    /// Minimum satellite elevation for use in a fix, degrees
    pub min_elevation_deg: i8,
    /// Static hold speed threshold, cm/s
    pub static_hold_threshold_cm_s: u8,
    /// Distance leaving static hold, meters
    pub static_hold_max_dist_m: u16,
}

impl Default for CfgNav5 {
    fn default() -> Self {
        Self {
            dynamic_model: DynamicModel::Airborne4g,
            fix_mode: FixMode::Only3d,
            min_elevation_deg: 15,
            static_hold_threshold_cm_s: 20,
            static_hold_max_dist_m: 1,
        }
    }
}

impl UbxCommand for CfgNav5 {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x24;

    fn payload(&self) -> Vec<u8> {
        let mask = NAV5_MASK_DYN
            | NAV5_MASK_MIN_EL
            | NAV5_MASK_FIX_MODE
            | NAV5_MASK_STATIC_HOLD
            | NAV5_MASK_UTC;
        let mut p = Vec::with_capacity(36);
        p.extend_from_slice(&mask.to_le_bytes());
        p.push(self.dynamic_model as u8);
        p.push(self.fix_mode as u8);
        p.extend_from_slice(&0i32.to_le_bytes()); // fixedAlt
        p.extend_from_slice(&0u32.to_le_bytes()); // fixedAltVar
        p.push(self.min_elevation_deg as u8);
        p.push(0); // drLimit
        p.extend_from_slice(&[0; 8]); // pDop, tDop, pAcc, tAcc
        p.push(self.static_hold_threshold_cm_s);
        p.extend_from_slice(&[0; 3]); // dgnssTimeout, cnoThreshNumSVs, cnoThresh
        p.extend_from_slice(&[0; 2]);
        p.extend_from_slice(&self.static_hold_max_dist_m.to_le_bytes());
        p.push(0); // automatic UTC standard
        p.extend_from_slice(&[0; 5]);
        p
    }
}

const NAVX5_MASK_MIN_MAX: u16 = 1 << 2;
const NAVX5_MASK_INITIAL_3D: u16 = 1 << 6;
const NAVX5_MASK_AOP: u16 = 1 << 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-NAVX5: satellite constraints and AssistNow Autonomous
pub struct CfgNavx5 {
    /// Minimum satellites for a navigation fix
    pub min_svs: u8,
    /// Maximum satellites for a navigation fix
    pub max_svs: u8,
    /// First fix must be 3D
    pub initial_fix_3d: bool,
    /// Enable AssistNow Autonomous
    pub assist_autonomous: bool,
    /// Maximum acceptable AssistNow Autonomous orbit error, meters
    pub aop_orbit_max_err_m: u16,
}

impl Default for CfgNavx5 {
    fn default() -> Self {
        Self {
            min_svs: 4,
            max_svs: 50,
            initial_fix_3d: true,
            assist_autonomous: true,
            aop_orbit_max_err_m: 20,
        }
    }
}

impl UbxCommand for CfgNavx5 {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x23;

    fn payload(&self) -> Vec<u8> {
        let mask1 = NAVX5_MASK_MIN_MAX | NAVX5_MASK_INITIAL_3D | NAVX5_MASK_AOP;
        let mut p = Vec::with_capacity(40);
        p.extend_from_slice(&0u16.to_le_bytes()); // version
        p.extend_from_slice(&mask1.to_le_bytes());
        p.extend_from_slice(&0u32.to_le_bytes()); // mask2
        p.extend_from_slice(&[0; 2]);
        p.push(self.min_svs);
        p.push(self.max_svs);
        p.push(0); // minCNO
        p.push(0);
        p.push(self.initial_fix_3d as u8);
        p.extend_from_slice(&[0; 2]);
        p.push(0); // ackAiding
        p.extend_from_slice(&0u16.to_le_bytes()); // wknRollover
        p.push(0); // sigAttenCompMode
        p.extend_from_slice(&[0; 5]);
        p.push(0); // usePPP
        p.push(self.assist_autonomous as u8);
        p.extend_from_slice(&[0; 2]);
        p.extend_from_slice(&self.aop_orbit_max_err_m.to_le_bytes());
        p.extend_from_slice(&[0; 7]);
        p.push(0); // useAdr
        p
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Constellation identifiers of UBX-CFG-GNSS
pub enum GnssId {
    /// GPS
    Gps = 0,
    /// SBAS
    Sbas = 1,
    /// Galileo
    Galileo = 2,
    /// BeiDou
    Beidou = 3,
    /// IMES
    Imes = 4,
    /// QZSS
    Qzss = 5,
    /// GLONASS
    Glonass = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One constellation entry of UBX-CFG-GNSS
pub struct GnssBlock {
    /// Constellation
    pub gnss: GnssId,
    /// Tracking channels reserved for it
    pub reserved_channels: u8,
    /// Upper bound of tracking channels
    pub max_channels: u8,
    /// Use the constellation
    pub enable: bool,
    /// Signals to track, e.g. 0x01 for Galileo E1
    pub signal_mask: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// UBX-CFG-GNSS: constellation mix
pub struct CfgGnss {
    /// Constellations to change; others keep their setting
    pub blocks: Vec<GnssBlock>,
}

impl Default for CfgGnss {
    /// Adds Galileo on top of the GPS/GLONASS/SBAS factory setting
    fn default() -> Self {
        Self {
            blocks: vec![GnssBlock {
                gnss: GnssId::Galileo,
                reserved_channels: 2,
                max_channels: 8,
                enable: true,
                signal_mask: 0x01,
            }],
        }
    }
}

impl UbxCommand for CfgGnss {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x3E;

    fn payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(4 + 8 * self.blocks.len());
        p.push(0); // msgVer
        p.push(0); // numTrkChHw, read only
        p.push(0xFF); // numTrkChUse, all available
        p.push(self.blocks.len() as u8);
        for block in &self.blocks {
            let flags = (block.enable as u32) | ((block.signal_mask as u32) << 16);
            p.push(block.gnss as u8);
            p.push(block.reserved_channels);
            p.push(block.max_channels);
            p.push(0);
            p.extend_from_slice(&flags.to_le_bytes());
        }
        p
    }
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
/// First configuration word of UBX-CFG-ITFM
pub struct ItfmConfig {
    /// Broadband jamming threshold, dB
    #[bits(4)]
    pub bb_threshold: u8,
    /// Continuous wave jamming threshold, dB
    #[bits(5)]
    pub cw_threshold: u8,
    /// Reserved algorithm settings
    #[bits(22)]
    pub algorithm_bits: u32,
    /// Enable interference detection
    pub enable: bool,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
/// Second configuration word of UBX-CFG-ITFM
pub struct ItfmConfig2 {
    /// Reserved general settings
    #[bits(12)]
    pub general_bits: u16,
    /// Antenna setting
    #[bits(2)]
    pub ant_setting: u8,
    /// Also scan the auxiliary band
    pub enable_aux: bool,
    #[bits(17)]
    __: u32,
}

/// Recommended value of the ITFM algorithm bits
pub const ITFM_ALGORITHM_BITS: u32 = 0x16B156;
/// Recommended value of the ITFM general bits
pub const ITFM_GENERAL_BITS: u16 = 0x31E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Antenna type reported to the interference monitor
pub enum Antenna {
    /// Unknown
    Unknown = 0,
    /// Passive antenna
    Passive = 1,
    /// Active antenna
    Active = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-ITFM: jamming and interference monitor
pub struct CfgItfm {
    /// Broadband threshold, dB (0..=15)
    pub broadband_threshold_db: u8,
    /// Continuous wave threshold, dB (0..=31)
    pub cw_threshold_db: u8,
    /// Enable detection
    pub enable: bool,
    /// Antenna setup
    pub antenna: Antenna,
}

impl Default for CfgItfm {
    fn default() -> Self {
        Self {
            broadband_threshold_db: 7,
            cw_threshold_db: 20,
            enable: true,
            antenna: Antenna::Active,
        }
    }
}

impl CfgItfm {
    /// Both configuration words
    pub fn words(&self) -> (ItfmConfig, ItfmConfig2) {
        let config = ItfmConfig::new()
            .with_bb_threshold(self.broadband_threshold_db.min(0x0F))
            .with_cw_threshold(self.cw_threshold_db.min(0x1F))
            .with_algorithm_bits(ITFM_ALGORITHM_BITS)
            .with_enable(self.enable);
        let config2 = ItfmConfig2::new()
            .with_general_bits(ITFM_GENERAL_BITS)
            .with_ant_setting(self.antenna as u8);
        (config, config2)
    }
}

impl UbxCommand for CfgItfm {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x39;

    fn payload(&self) -> Vec<u8> {
        let (config, config2) = self.words();
        let mut p = Vec::with_capacity(8);
        p.extend_from_slice(&config.into_bits().to_le_bytes());
        p.extend_from_slice(&config2.into_bits().to_le_bytes());
        p
    }
}

/// Every configuration section of an M8 receiver
pub const CFG_MASK_ALL: u32 = 0x0000_1F1F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
/// Non-volatile storage targeted by UBX-CFG-CFG
pub enum SaveDevice {
    /// Battery backed RAM, for receivers without flash
    Bbr = 0x01,
    /// Programmable flash
    Flash = 0x02,
    /// I2C EEPROM
    Eeprom = 0x04,
    /// SPI flash
    SpiFlash = 0x10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-CFG: clear, save or load configuration sections
pub struct CfgCfg {
    /// Sections reset to default
    pub clear_mask: u32,
    /// Sections written to storage
    pub save_mask: u32,
    /// Sections loaded from storage
    pub load_mask: u32,
    /// Where to save
    pub device: SaveDevice,
}

impl CfgCfg {
    /// Persist the whole current configuration
    pub fn save_all(device: SaveDevice) -> Self {
        Self {
            clear_mask: 0,
            save_mask: CFG_MASK_ALL,
            load_mask: 0,
            device,
        }
    }
}

impl UbxCommand for CfgCfg {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x09;

    fn payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(13);
        p.extend_from_slice(&self.clear_mask.to_le_bytes());
        p.extend_from_slice(&self.save_mask.to_le_bytes());
        p.extend_from_slice(&self.load_mask.to_le_bytes());
        p.push(self.device as u8);
        p
    }
}

const UART1: u8 = 1;
const UART_MODE_8N1: u32 = 0x0000_08D0;
const PROTO_UBX: u16 = 0x01;
const PROTO_NMEA: u16 = 0x02;
const PROTO_RTCM: u16 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// UBX-CFG-PRT for UART1: baud rate change
pub struct CfgPrtUart {
    /// New baud rate
    pub baud_rate: u32,
}

impl UbxCommand for CfgPrtUart {
    const CLASS: u8 = CLASS_CFG;
    const ID: u8 = 0x00;

    fn payload(&self) -> Vec<u8> {
        let mut p = Vec::with_capacity(20);
        p.push(UART1);
        p.push(0);
        p.extend_from_slice(&0u16.to_le_bytes()); // txReady
        p.extend_from_slice(&UART_MODE_8N1.to_le_bytes());
        p.extend_from_slice(&self.baud_rate.to_le_bytes());
        p.extend_from_slice(&(PROTO_UBX | PROTO_NMEA | PROTO_RTCM).to_le_bytes());
        p.extend_from_slice(&(PROTO_UBX | PROTO_NMEA).to_le_bytes());
        p.extend_from_slice(&0u16.to_le_bytes()); // flags
        p.extend_from_slice(&[0; 2]);
        p
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rate_packet() {
        let packet = CfgRate::from_hz(4.0, 1).to_packet();
        assert_eq!(
            packet.to_bytes(),
            [0xB5, 0x62, 0x06, 0x08, 0x06, 0x00, 0xFA, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0F, 0x94]
        );
        assert_eq!(measurement_interval_ms(3.0), 333);
        assert_eq!(measurement_interval_ms(10.0), 100);
    }

    #[test]
    fn gnss_start_stop() {
        assert_eq!(
            CfgRst::gnss_stop().to_packet().to_bytes(),
            [0xB5, 0x62, 0x06, 0x04, 0x04, 0x00, 0x00, 0x00, 0x08, 0x00, 0x16, 0x74]
        );
        assert_eq!(
            CfgRst::gnss_start().to_packet().to_bytes(),
            [0xB5, 0x62, 0x06, 0x04, 0x04, 0x00, 0x00, 0x00, 0x09, 0x00, 0x17, 0x76]
        );
    }

    #[test]
    fn disable_vtg() {
        assert_eq!(
            CfgMsg::disable_nmea(NMEA_VTG).to_packet().to_bytes(),
            [0xB5, 0x62, 0x06, 0x01, 0x03, 0x00, 0xF0, 0x05, 0x00, 0xFF, 0x19]
        );
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(CfgNav5::default().payload().len(), 36);
        assert_eq!(CfgNavx5::default().payload().len(), 40);
        assert_eq!(CfgGnss::default().payload().len(), 12);
        assert_eq!(CfgItfm::default().payload().len(), 8);
        assert_eq!(CfgCfg::save_all(SaveDevice::Flash).payload().len(), 13);
        assert_eq!(CfgPrtUart { baud_rate: 115200 }.payload().len(), 20);
    }

    #[test]
    fn length_field_is_little_endian() {
        let packet = CommandPacket::new(CLASS_CFG, 0x99, vec![0; 0x0102]).to_bytes();
        assert_eq!(&packet[4..6], &[0x02, 0x01]);
        assert_eq!(packet.len(), 0x0102 + 8);
    }

    #[test]
    fn nav5_fields() {
        let p = CfgNav5::default().payload();
        assert_eq!(&p[0..2], &[0x47, 0x04]);
        assert_eq!(p[2], 8);
        assert_eq!(p[3], 2);
        assert_eq!(p[12], 15);
        assert_eq!(p[22], 20);
        assert_eq!(&p[28..30], &[1, 0]);
    }

    #[test]
    fn navx5_fields() {
        let p = CfgNavx5::default().payload();
        assert_eq!(&p[2..4], &[0x44, 0x40]);
        assert_eq!((p[10], p[11]), (4, 50));
        assert_eq!(p[14], 1);
        assert_eq!(p[27], 1);
        assert_eq!(&p[30..32], &[20, 0]);
    }

    #[test]
    fn galileo_block() {
        let p = CfgGnss::default().payload();
        assert_eq!(p, [0x00, 0x00, 0xFF, 0x01, 0x02, 0x02, 0x08, 0x00, 0x01, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn itfm_words() {
        let p = CfgItfm::default().payload();
        assert_eq!(p, [0x47, 0xAD, 0x62, 0xAD, 0x1E, 0x23, 0x00, 0x00]);
        let (config, _) = CfgItfm {
            broadband_threshold_db: 40,
            ..Default::default()
        }
        .words();
        assert_eq!(config.bb_threshold(), 15);
    }

    #[test]
    fn save_to_bbr() {
        let p = CfgCfg::save_all(SaveDevice::Bbr).payload();
        assert_eq!(&p[4..8], &[0x1F, 0x1F, 0x00, 0x00]);
        assert_eq!(p[12], 0x01);
    }

    #[test]
    fn uart_baud() {
        let p = CfgPrtUart { baud_rate: 115200 }.payload();
        assert_eq!(p[0], 1);
        assert_eq!(&p[4..8], &[0xD0, 0x08, 0x00, 0x00]);
        assert_eq!(&p[8..12], &115200u32.to_le_bytes());
    }
}
