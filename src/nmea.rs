use chrono::{NaiveTime, Timelike};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::{collections::HashMap, fmt};

use crate::{
    buffer::RawRecord,
    checksum::nmea_checksum_valid,
    config::ErrorModel,
    error::{DecodeError, GpsError},
    uncertain::Uncertain,
};

/// Three letter sentence kind, e.g. `GLL`
pub type SentenceKind = [u8; 3];

/// Geographic position, latitude/longitude
pub const GLL: SentenceKind = *b"GLL";
/// Recommended minimum data
pub const RMC: SentenceKind = *b"RMC";
/// Fix data with altitude
pub const GGA: SentenceKind = *b"GGA";
/// DOP and active satellites
pub const GSA: SentenceKind = *b"GSA";

// Field offsets, counted with the address field at 0
const GSA_HDOP: usize = 16;
const GSA_VDOP: usize = 17;
const MAX_COURSE_DEG: f64 = 360.0;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A checksum-verified NMEA sentence split into its fields.
pub struct Sentence {
    /// Talker, e.g. `GN`
    pub id: [u8; 2],
    /// Kind, e.g. `GGA`
    pub class: SentenceKind,
    fields: Vec<String>,
}

impl Sentence {
    /// Validate and split a framed record.
    pub fn decode(record: &RawRecord) -> Result<Self, DecodeError> {
        let bytes = record.as_bytes();
        if !nmea_checksum_valid(bytes) {
            return Err(DecodeError::ChecksumMismatch);
        }
        let text = std::str::from_utf8(bytes)?;
        let star = text.find('*').ok_or(DecodeError::ChecksumMismatch)?;
        let body = text.get(1..star).ok_or(DecodeError::Truncated)?;
        if star < 6 {
            return Err(DecodeError::Truncated);
        }
        let id: [u8; 2] = bytes[1..3].try_into().map_err(|_| DecodeError::Truncated)?;
        let class = record.kind().ok_or(DecodeError::Truncated)?;
        Ok(Self {
            id,
            class,
            fields: body.split(',').map(String::from).collect(),
        })
    }

    /// Field at `idx`, `None` when missing or empty
    pub fn field(&self, idx: usize) -> Option<&str> {
        self.fields
            .get(idx)
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    /// Number of fields including the address
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the sentence has no fields at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn number(&self, idx: usize) -> Option<f64> {
        self.field(idx).and_then(|f| f.parse().ok())
    }

    fn time(&self, idx: usize) -> Option<TimeOfDay> {
        self.field(idx).and_then(parse_time)
    }

    fn coordinate(
        &self,
        idx: usize,
        parse: fn(&str, &str) -> Result<f64, GpsError>,
    ) -> Option<f64> {
        let value = self.field(idx)?;
        let dir = self.field(idx + 1)?;
        parse(value, dir)
            .map_err(|e| log::debug!("Dropping coordinate {value:?} {dir:?}: {e}"))
            .ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// UTC time of day, shown as `HH:MM:SS`
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Inner time value
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Seconds since midnight
    pub fn seconds(&self) -> u32 {
        self.0.num_seconds_from_midnight()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
/// Horizontal position from GLL, error from GSA
pub struct Position {
    /// Degrees, north positive
    pub latitude: Option<f64>,
    /// Degrees, east positive
    pub longitude: Option<f64>,
    /// 1-sigma horizontal error in meters
    pub horizontal_error: Option<f64>,
    /// Time of the fix
    pub time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
/// Motion over ground from RMC
pub struct Velocity {
    /// Knots
    pub speed_over_ground: Option<f64>,
    /// Degrees true, absent when too slow to resolve
    pub course_over_ground: Option<f64>,
    /// Degrees, east positive
    pub magnetic_variation: Option<f64>,
    /// Time of the fix
    pub time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
/// Height from GGA, error from GSA
pub struct Altitude {
    /// Meters above mean sea level
    pub altitude: Option<f64>,
    /// Geoid separation in meters
    pub geoid_separation: Option<f64>,
    /// 1-sigma vertical error in meters
    pub vertical_error: Option<f64>,
    /// Time of the fix
    pub time: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
/// Everything the receiver reported about the latest solution
pub struct Fix {
    /// Degrees, north positive
    pub latitude: Option<f64>,
    /// Degrees, east positive
    pub longitude: Option<f64>,
    /// Meters above mean sea level
    pub altitude: Option<f64>,
    /// HDOP derived 1-sigma error, meters
    pub horizontal_error: Option<f64>,
    /// VDOP derived 1-sigma error, meters
    pub vertical_error: Option<f64>,
    /// Combined 3D error in meters at the configured confidence
    pub position_error: Option<f64>,
    /// Knots
    pub speed_over_ground: Option<f64>,
    /// Degrees true
    pub course_over_ground: Option<f64>,
    /// Degrees, east positive
    pub magnetic_variation: Option<f64>,
    /// Meters
    pub geoid_separation: Option<f64>,
    /// First timestamp found in position, velocity, altitude order
    pub time: Option<TimeOfDay>,
}

impl Fix {
    /// Merge the three partial readings.
    pub fn combine(pos: Position, vel: Velocity, alt: Altitude, model: &ErrorModel) -> Self {
        let position_error = match (pos.horizontal_error, alt.vertical_error) {
            (Some(h), Some(v)) => Some(
                (Uncertain::new(0.0, h) + Uncertain::new(0.0, v))
                    .scale_error(model.confidence_scale)
                    .error(),
            ),
            _ => None,
        };
        Self {
            latitude: pos.latitude,
            longitude: pos.longitude,
            altitude: alt.altitude,
            horizontal_error: pos.horizontal_error,
            vertical_error: alt.vertical_error,
            position_error,
            speed_over_ground: vel.speed_over_ground,
            course_over_ground: vel.course_over_ground,
            magnetic_variation: vel.magnetic_variation,
            geoid_separation: alt.geoid_separation,
            time: pos.time.or(vel.time).or(alt.time),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Latest validated sentence of each kind.
pub struct SentenceCache {
    sentences: HashMap<SentenceKind, Sentence>,
}

impl SentenceCache {
    /// Validate a record and store it over any previous sentence of its kind
    pub fn decode(&mut self, record: &RawRecord) -> Result<SentenceKind, DecodeError> {
        let sentence = Sentence::decode(record)?;
        let kind = sentence.class;
        self.sentences.insert(kind, sentence);
        Ok(kind)
    }

    /// Cached sentence of a kind
    pub fn get(&self, kind: &SentenceKind) -> Option<&Sentence> {
        self.sentences.get(kind)
    }

    /// Number of kinds seen so far
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Whether nothing was decoded yet
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    fn dop(&self, idx: usize) -> Option<f64> {
        self.get(&GSA).and_then(|gsa| gsa.number(idx))
    }

    /// Position from the cached GLL, error from GSA HDOP
    pub fn position(&self, model: &ErrorModel) -> Position {
        let Some(gll) = self.get(&GLL) else {
            return Position::default();
        };
        let time = gll.time(5);
        if gll.field(6) != Some("A") {
            return Position {
                time,
                ..Default::default()
            };
        }
        Position {
            latitude: gll.coordinate(1, parse_lat),
            longitude: gll.coordinate(3, parse_lon),
            horizontal_error: self
                .dop(GSA_HDOP)
                .map(|hdop| hdop * model.horizontal_accuracy),
            time,
        }
    }

    /// Speed and course from the cached RMC
    pub fn velocity(&self) -> Velocity {
        let Some(rmc) = self.get(&RMC) else {
            return Velocity::default();
        };
        let time = rmc.time(1);
        if rmc.field(2) != Some("A") {
            return Velocity {
                time,
                ..Default::default()
            };
        }
        Velocity {
            speed_over_ground: rmc.number(7),
            course_over_ground: rmc.number(8).filter(|cog| *cog <= MAX_COURSE_DEG),
            magnetic_variation: rmc.number(10).map(|var| match rmc.field(11) {
                Some("W") => -var,
                _ => var,
            }),
            time,
        }
    }

    /// Altitude from the cached GGA, error from GSA VDOP
    pub fn altitude(&self, model: &ErrorModel) -> Altitude {
        let Some(gga) = self.get(&GGA) else {
            return Altitude::default();
        };
        let time = gga.time(1);
        if matches!(gga.field(6), None | Some("0")) {
            return Altitude {
                time,
                ..Default::default()
            };
        }
        Altitude {
            altitude: gga.number(9),
            geoid_separation: gga.number(11),
            vertical_error: self
                .dop(GSA_VDOP)
                .map(|vdop| vdop * model.vertical_accuracy),
            time,
        }
    }

    /// All three readings merged
    pub fn fix(&self, model: &ErrorModel) -> Fix {
        Fix::combine(
            self.position(model),
            self.velocity(),
            self.altitude(model),
            model,
        )
    }
}

fn parse_time(inp: &str) -> Option<TimeOfDay> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^(?<hour>\d{2})(?<minute>\d{2})(?<second>\d{2})(\.\d*)?$")
            .expect("Failed to compile regex");
    }
    let caps = RE.captures(inp)?;
    let hour = caps["hour"].parse().ok()?;
    let minute = caps["minute"].parse().ok()?;
    let time = match caps["second"].parse().ok()? {
        // leap second, chrono keeps it as 59 s + 1000 ms
        60 => NaiveTime::from_hms_milli_opt(hour, minute, 59, 1000),
        second => NaiveTime::from_hms_opt(hour, minute, second),
    };
    time.map(TimeOfDay)
}

fn parse_degrees_minutes(inp: &str) -> Result<f64, GpsError> {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(r"^(?<deg>\d+)(?<min>\d{2}(\.\d*)?)$").expect("Failed to compile regex");
    }
    let inp = RE.captures(inp).ok_or(GpsError::PatternNotFound)?;
    let deg = inp["deg"]
        .parse::<f64>()
        .map_err(|_| GpsError::ParseError("degrees".into()))?;
    let min = inp["min"]
        .parse::<f64>()
        .map_err(|_| GpsError::ParseError("minutes".into()))?;
    Ok(deg + min / 60.0)
}

fn parse_lat(inp: &str, dir: &str) -> Result<f64, GpsError> {
    let lat = parse_degrees_minutes(inp)?;
    match dir {
        "N" => Ok(lat),
        "S" => Ok(-lat),
        _ => Err(GpsError::ParseError("latitude hemisphere".into())),
    }
}

fn parse_lon(inp: &str, dir: &str) -> Result<f64, GpsError> {
    let lon = parse_degrees_minutes(inp)?;
    match dir {
        "E" => Ok(lon),
        "W" => Ok(-lon),
        _ => Err(GpsError::ParseError("longitude hemisphere".into())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::SentenceBuffer;

    const GLL_VALID: &[u8] = b"$GNGLL,5321.6729,N,00630.8302,W,092750.00,A,A*6F\r\n";
    const GLL_INVALID: &[u8] = b"$GNGLL,5321.6729,N,00630.8302,W,092750.00,V,N*77\r\n";
    const RMC_VALID: &[u8] =
        b"$GNRMC,092750.00,A,5321.6729,N,00630.8302,W,0.154,77.52,191026,,,A*52\r\n";
    const RMC_SOUTH_EAST: &[u8] =
        b"$GNRMC,092751.00,A,5321.6729,S,00630.8302,E,0.000,,191026,3.5,W,A*0A\r\n";
    const RMC_INVALID: &[u8] = b"$GNRMC,092750.00,V,,,,,,,191026,,,N*67\r\n";
    const GGA_VALID: &[u8] =
        b"$GNGGA,092750.00,5321.6729,N,00630.8302,W,1,08,1.01,499.6,M,48.0,M,,*5C\r\n";
    const GGA_NO_FIX: &[u8] = b"$GNGGA,092750.00,,,,,0,00,99.99,,,,,,*71\r\n";
    const GSA_V41: &[u8] = b"$GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38,1*09\r\n";
    const GSA_V23: &[u8] = b"$GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38*14\r\n";

    fn cache_of(data: &[&[u8]]) -> SentenceCache {
        let mut buf = SentenceBuffer::new(4096);
        let mut cache = SentenceCache::default();
        for d in data {
            buf.append(d);
        }
        for rec in buf {
            cache.decode(&rec).expect("valid record");
        }
        cache
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-6)
    }

    #[test]
    fn gll_position() {
        let cache = cache_of(&[GLL_VALID, GSA_V41]);
        let pos = cache.position(&ErrorModel::default());
        assert!(close(pos.latitude, 53.361215));
        assert!(close(pos.longitude, -6.5138367));
        assert!(close(pos.horizontal_error, 1.03 * 2.5));
        assert_eq!(pos.time.unwrap().to_string(), "09:27:50");
    }

    #[test]
    fn gll_without_gsa_has_no_error() {
        let pos = cache_of(&[GLL_VALID]).position(&ErrorModel::default());
        assert!(pos.latitude.is_some());
        assert!(pos.horizontal_error.is_none());
    }

    #[test]
    fn invalid_gll_reports_only_time() {
        let pos = cache_of(&[GLL_INVALID, GSA_V41]).position(&ErrorModel::default());
        assert_eq!(pos.latitude, None);
        assert_eq!(pos.longitude, None);
        assert_eq!(pos.horizontal_error, None);
        assert_eq!(pos.time.unwrap().to_string(), "09:27:50");
    }

    #[test]
    fn missing_kinds_are_absent() {
        let cache = SentenceCache::default();
        let model = ErrorModel::default();
        assert_eq!(cache.position(&model), Position::default());
        assert_eq!(cache.velocity(), Velocity::default());
        assert_eq!(cache.altitude(&model), Altitude::default());
        assert_eq!(cache.fix(&model), Fix::default());
    }

    #[test]
    fn rmc_velocity() {
        let vel = cache_of(&[RMC_VALID]).velocity();
        assert!(close(vel.speed_over_ground, 0.154));
        assert!(close(vel.course_over_ground, 77.52));
        assert_eq!(vel.magnetic_variation, None);
        assert_eq!(vel.time.unwrap().to_string(), "09:27:50");

        let vel = cache_of(&[RMC_SOUTH_EAST]).velocity();
        assert!(close(vel.speed_over_ground, 0.0));
        assert_eq!(vel.course_over_ground, None);
        assert!(close(vel.magnetic_variation, -3.5));
        assert_eq!(vel.time.unwrap().to_string(), "09:27:51");

        let vel = cache_of(&[RMC_INVALID]).velocity();
        assert_eq!(vel.speed_over_ground, None);
        assert!(vel.time.is_some());
    }

    #[test]
    fn gga_altitude() {
        let cache = cache_of(&[GGA_VALID, GSA_V23]);
        let alt = cache.altitude(&ErrorModel::default());
        assert!(close(alt.altitude, 499.6));
        assert!(close(alt.geoid_separation, 48.0));
        assert!(close(alt.vertical_error, 1.38 * 2.5));

        let model = ErrorModel {
            vertical_accuracy: 5.0,
            ..Default::default()
        };
        assert!(close(cache.altitude(&model).vertical_error, 1.38 * 5.0));

        let alt = cache_of(&[GGA_NO_FIX, GSA_V23]).altitude(&ErrorModel::default());
        assert_eq!(alt.altitude, None);
        assert_eq!(alt.vertical_error, None);
        assert!(alt.time.is_some());
    }

    #[test]
    fn last_write_wins() {
        let cache = cache_of(&[GLL_VALID, GLL_INVALID]);
        assert_eq!(cache.len(), 1);
        assert!(cache.position(&ErrorModel::default()).latitude.is_none());
    }

    #[test]
    fn combined_fix() {
        let cache = cache_of(&[GLL_VALID, RMC_VALID, GGA_VALID, GSA_V41]);
        let fix = cache.fix(&ErrorModel::default());
        let h: f64 = 1.03 * 2.5;
        let v: f64 = 1.38 * 2.5;
        assert!(close(fix.horizontal_error, h));
        assert!(close(fix.vertical_error, v));
        assert!(close(fix.position_error, 2.45 * (h * h + v * v).sqrt()));
        assert!(close(fix.altitude, 499.6));
        assert!(close(fix.speed_over_ground, 0.154));
        assert_eq!(fix.time.unwrap().to_string(), "09:27:50");
    }

    #[test]
    fn timestamp_preference() {
        let model = ErrorModel::default();
        let t = |s: &str| parse_time(s);
        let pos = Position {
            time: t("010101"),
            ..Default::default()
        };
        let vel = Velocity {
            time: t("020202"),
            ..Default::default()
        };
        let alt = Altitude {
            time: t("030303"),
            ..Default::default()
        };
        let time = |p, v, a| Fix::combine(p, v, a, &model).time.map(|t| t.to_string());
        assert_eq!(time(pos, vel, alt).as_deref(), Some("01:01:01"));
        assert_eq!(time(Position::default(), vel, alt).as_deref(), Some("02:02:02"));
        assert_eq!(
            time(Position::default(), Velocity::default(), alt).as_deref(),
            Some("03:03:03")
        );
        assert_eq!(
            time(Position::default(), Velocity::default(), Altitude::default()),
            None
        );
    }

    #[test]
    fn time_field() {
        assert_eq!(parse_time("235959").unwrap().to_string(), "23:59:59");
        assert_eq!(parse_time("092750.123").unwrap().seconds(), 9 * 3600 + 27 * 60 + 50);
        assert!(parse_time("").is_none());
        assert!(parse_time("9275").is_none());
        assert!(parse_time("256000").is_none());
    }

    #[test]
    fn leap_second() {
        let t = parse_time("235960").unwrap();
        assert_eq!(t.to_string(), "23:59:60");
        assert_eq!(t.seconds(), 86399);
        assert!(parse_time("235961").is_none());
    }

    #[test]
    fn fix_without_altitude_keeps_horizontal_error() {
        let fix = cache_of(&[GLL_VALID, GSA_V41]).fix(&ErrorModel::default());
        assert!(close(fix.horizontal_error, 1.03 * 2.5));
        assert_eq!(fix.vertical_error, None);
        assert_eq!(fix.position_error, None);
    }

    #[test]
    fn degrees_minutes() {
        assert!((parse_lat("0000.0000", "N").unwrap()).abs() < 1e-12);
        assert!((parse_lon("17959.9999", "W").unwrap() + 179.99999833).abs() < 1e-6);
        assert!(parse_lat("21.5", "N").is_err());
        assert!(parse_lat("5321.6729", "E").is_err());
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let mut buf = SentenceBuffer::default();
        buf.append(b"$GNGLL,5321.6729,N,00630.8302,W,092750.00,A,A*68\r\n");
        let rec = buf.extract_next().unwrap();
        let mut cache = SentenceCache::default();
        assert_eq!(cache.decode(&rec), Err(DecodeError::ChecksumMismatch));
        assert!(cache.is_empty());
    }

    #[test]
    fn non_text_record_is_rejected() {
        let body: &[u8] = b"GNTXT,01,01,02,\xff\xfe";
        let ck = body.iter().fold(0u8, |a, &b| a ^ b);
        let mut data = b"$".to_vec();
        data.extend_from_slice(body);
        data.extend_from_slice(format!("*{:02X}\r\n", ck).as_bytes());
        let mut buf = SentenceBuffer::default();
        buf.append(&data);
        let rec = buf.extract_next().unwrap();
        let mut cache = SentenceCache::default();
        assert!(matches!(cache.decode(&rec), Err(DecodeError::TextDecode(_))));
    }

    #[test]
    fn short_address_is_truncated() {
        let mut buf = SentenceBuffer::default();
        buf.append(b"$GP*17\r\n");
        let rec = buf.extract_next().unwrap();
        assert_eq!(Sentence::decode(&rec), Err(DecodeError::Truncated));
    }
}
