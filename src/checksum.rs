/// Verify the XOR checksum trailer of a framed NMEA record.
///
/// Every byte strictly between the leading `$` and the `*` delimiter is
/// XORed and compared against the two uppercase hex digits after `*`.
/// A record without delimiter or without two trailing digits is invalid.
pub fn nmea_checksum_valid(record: &[u8]) -> bool {
    let Some(star) = record.iter().position(|&b| b == b'*') else {
        return false;
    };
    if star < 1 || record.len() < star + 3 {
        return false;
    }
    let calc = record[1..star].iter().fold(0u8, |acc, &x| acc ^ x);
    let expect = format!("{:02X}", calc);
    record[star + 1..star + 3] == *expect.as_bytes()
}

/// UBX two-accumulator checksum over class, id, length and payload.
pub fn ubx_checksum(bytes: &[u8]) -> (u8, u8) {
    bytes.iter().fold((0u8, 0u8), |(ck_a, ck_b), &x| {
        let ck_a = ck_a.wrapping_add(x);
        (ck_a, ck_b.wrapping_add(ck_a))
    })
}
