/// Default size of the sliding window, in bytes
pub const DEFAULT_CAPACITY: usize = 512;

const START_MARKER: u8 = b'$';
const TERMINATOR: u8 = b'\n';

#[derive(Debug, Clone, PartialEq, Eq)]
/// One framed ASCII sentence, marker and terminator included.
///
/// The checksum has not been verified yet.
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    /// Raw bytes of the record
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Sentence kind at bytes 3..6 (`GLL` in `$GNGLL`), if the record is long enough
    pub fn kind(&self) -> Option<[u8; 3]> {
        self.0.get(3..6).and_then(|k| k.try_into().ok())
    }
}

impl AsRef<[u8]> for RawRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone)]
/// Bounded window over the most recent transport bytes.
///
/// Only the newest `capacity` bytes are kept. A sentence straddling a
/// dropped span is lost; the receiver repeats every kind at its output rate.
pub struct SentenceBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SentenceBuffer {
    /// Create an empty buffer holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append transport bytes, dropping the oldest ones beyond capacity
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        if self.buf.len() > self.capacity {
            let excess = self.buf.len() - self.capacity;
            self.buf.drain(..excess);
        }
    }

    /// Take the first complete record out of the buffer.
    ///
    /// Returns `None` and leaves the buffer untouched when no `$` or no
    /// terminator after it is present yet. Otherwise the record and
    /// everything in front of it is removed.
    pub fn extract_next(&mut self) -> Option<RawRecord> {
        let start = self.buf.iter().position(|&b| b == START_MARKER)?;
        let end = start + self.buf[start..].iter().position(|&b| b == TERMINATOR)?;
        let record = self.buf[start..=end].to_vec();
        self.buf.drain(..=end);
        Some(RawRecord(record))
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Upper bound on buffered bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Iterator for SentenceBuffer {
    type Item = RawRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.extract_next()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GLL: &[u8] = b"$GNGLL,5321.6729,N,00630.8302,W,092750.00,A,A*6F\r\n";
    const GGA: &[u8] = b"$GNGGA,092750.00,,,,,0,00,99.99,,,,,,*71\r\n";

    #[test]
    fn extracts_in_order() {
        let mut buf = SentenceBuffer::default();
        buf.append(GLL);
        buf.append(GGA);
        assert_eq!(buf.extract_next().unwrap().as_bytes(), GLL);
        assert_eq!(buf.extract_next().unwrap().as_bytes(), GGA);
        assert!(buf.extract_next().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_record_is_kept() {
        let mut buf = SentenceBuffer::default();
        buf.append(&GLL[..20]);
        assert!(buf.extract_next().is_none());
        assert_eq!(buf.len(), 20);
        buf.append(&GLL[20..]);
        let rec = buf.extract_next().unwrap();
        assert_eq!(rec.as_bytes(), GLL);
        assert_eq!(rec.kind(), Some(*b"GLL"));
    }

    #[test]
    fn leading_garbage_is_discarded() {
        let mut buf = SentenceBuffer::default();
        buf.append(b"0.00,A,A*6F\r\n\xb5\x62\x05\x01");
        buf.append(GGA);
        assert_eq!(buf.extract_next().unwrap().as_bytes(), GGA);
        assert!(buf.is_empty());
    }

    #[test]
    fn terminator_before_marker_is_skipped() {
        let mut buf = SentenceBuffer::default();
        buf.append(b"\n\n$GNGLL");
        assert!(buf.extract_next().is_none());
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut buf = SentenceBuffer::new(64);
        for chunk in 0..40u8 {
            buf.append(&[chunk; 7]);
            assert!(buf.len() <= buf.capacity());
        }
        // the newest bytes survive
        assert_eq!(buf.buf[buf.len() - 1], 39);
        assert_eq!(buf.buf[0], 30);
    }

    #[test]
    fn oversized_append_keeps_tail() {
        let mut buf = SentenceBuffer::new(GGA.len());
        let mut data = GLL.to_vec();
        data.extend_from_slice(GGA);
        buf.append(&data);
        assert_eq!(buf.len(), GGA.len());
        assert_eq!(buf.collect::<Vec<_>>(), vec![RawRecord(GGA.to_vec())]);
    }
}
