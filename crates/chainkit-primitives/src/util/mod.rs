//! Big-endian binary reader and writer.
//!
//! Every wire primitive of the network is laid out with fixed-width
//! big-endian integers and 4-byte big-endian length prefixes for
//! variable-length collections. `BinaryReader` and `BinaryWriter` are the
//! cursor types the codec is built on.

use crate::ids::{Address, Id, NodeId, ID_LEN, SHORT_ID_LEN};
use crate::PrimitivesError;

// ---------------------------------------------------------------------------
// BinaryReader
// ---------------------------------------------------------------------------

/// A cursor-based reader over big-endian protocol data.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        BinaryReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance the position.
    ///
    /// # Returns
    /// A byte slice of length `n`, or `UnexpectedEof` if insufficient data remains.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, PrimitivesError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, PrimitivesError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, PrimitivesError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Read a 32-byte identifier.
    pub fn read_id(&mut self) -> Result<Id, PrimitivesError> {
        Ok(Id::new(self.read_array::<ID_LEN>()?))
    }

    /// Read a 20-byte address.
    pub fn read_address(&mut self) -> Result<Address, PrimitivesError> {
        Ok(Address::new(self.read_array::<SHORT_ID_LEN>()?))
    }

    /// Read a 20-byte node identity.
    pub fn read_node_id(&mut self) -> Result<NodeId, PrimitivesError> {
        Ok(NodeId::new(self.read_array::<SHORT_ID_LEN>()?))
    }

    /// Read a 4-byte element count.
    ///
    /// Every element occupies at least one byte, so a count larger than the
    /// unread data is rejected before anything is allocated.
    pub fn read_len(&mut self) -> Result<usize, PrimitivesError> {
        let n = self.read_u32()? as usize;
        if n > self.remaining() {
            return Err(PrimitivesError::LengthOverflow(n as u64));
        }
        Ok(n)
    }

    /// Read a 4-byte length prefix followed by that many bytes.
    pub fn read_prefixed_bytes(&mut self) -> Result<&'a [u8], PrimitivesError> {
        let n = self.read_len()?;
        self.read_bytes(n)
    }

    /// Read a 2-byte length prefix followed by a UTF-8 string.
    pub fn read_short_string(&mut self) -> Result<String, PrimitivesError> {
        let n = self.read_u16()? as usize;
        let bytes = self.read_bytes(n)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PrimitivesError::Other(format!("invalid utf-8 string: {e}")))
    }

    /// Return the number of bytes remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Return the current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }
}

// ---------------------------------------------------------------------------
// BinaryWriter
// ---------------------------------------------------------------------------

/// A buffer-based writer producing big-endian protocol data.
#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    /// Create a new empty writer.
    pub fn new() -> Self {
        BinaryWriter { buf: Vec::new() }
    }

    /// Create a new writer with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        BinaryWriter { buf: Vec::with_capacity(capacity) }
    }

    /// Append raw bytes to the buffer.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    /// Append a big-endian u16.
    pub fn write_u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Append a big-endian u32.
    pub fn write_u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Append a big-endian u64.
    pub fn write_u64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Append a 32-byte identifier.
    pub fn write_id(&mut self, id: &Id) {
        self.buf.extend_from_slice(id.as_bytes());
    }

    /// Append a 20-byte address.
    pub fn write_address(&mut self, address: &Address) {
        self.buf.extend_from_slice(address.as_bytes());
    }

    /// Append a 20-byte node identity.
    pub fn write_node_id(&mut self, node_id: &NodeId) {
        self.buf.extend_from_slice(node_id.as_bytes());
    }

    /// Append a 4-byte element count.
    pub fn write_len(&mut self, len: usize) -> Result<(), PrimitivesError> {
        let n = u32::try_from(len).map_err(|_| PrimitivesError::NumberTooLarge { width: 4 })?;
        self.write_u32(n);
        Ok(())
    }

    /// Append a 4-byte length prefix followed by `bytes`.
    pub fn write_prefixed_bytes(&mut self, bytes: &[u8]) -> Result<(), PrimitivesError> {
        self.write_len(bytes.len())?;
        self.write_bytes(bytes);
        Ok(())
    }

    /// Append a 2-byte length prefix followed by the UTF-8 bytes of `s`.
    pub fn write_short_string(&mut self, s: &str) -> Result<(), PrimitivesError> {
        let n = u16::try_from(s.len()).map_err(|_| PrimitivesError::NumberTooLarge { width: 2 })?;
        self.write_u16(n);
        self.write_bytes(s.as_bytes());
        Ok(())
    }

    /// Consume the writer and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Return a reference to the current buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Return the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_writer_roundtrip() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x42);
        writer.write_u16(0x1234);
        writer.write_u32(0xDEADBEEF);
        writer.write_u64(0x0102030405060708);
        writer.write_prefixed_bytes(b"hello").unwrap();
        writer.write_short_string("memo").unwrap();

        let data = writer.into_bytes();
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64().unwrap(), 0x0102030405060708);
        assert_eq!(reader.read_prefixed_bytes().unwrap(), b"hello");
        assert_eq!(reader.read_short_string().unwrap(), "memo");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_integers_are_big_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(1);
        writer.write_u16(0x0102);
        assert_eq!(writer.as_bytes(), &[0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_length_prefix_is_four_bytes() {
        let mut writer = BinaryWriter::new();
        writer.write_prefixed_bytes(&[0xaa, 0xbb]).unwrap();
        assert_eq!(writer.into_bytes(), vec![0, 0, 0, 2, 0xaa, 0xbb]);
    }

    #[test]
    fn test_reader_eof() {
        let mut reader = BinaryReader::new(&[0x01]);
        assert!(reader.read_u8().is_ok());
        assert!(matches!(reader.read_u8(), Err(PrimitivesError::UnexpectedEof)));
    }

    #[test]
    fn test_reader_rejects_oversized_count() {
        let mut reader = BinaryReader::new(&[0xff, 0xff, 0xff, 0xff, 0x00]);
        assert!(matches!(
            reader.read_len(),
            Err(PrimitivesError::LengthOverflow(_))
        ));
    }

    #[test]
    fn test_ids_roundtrip() {
        let id = Id::new([5u8; 32]);
        let addr = Address::new([6u8; 20]);
        let mut writer = BinaryWriter::new();
        writer.write_id(&id);
        writer.write_address(&addr);
        let data = writer.into_bytes();
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_id().unwrap(), id);
        assert_eq!(reader.read_address().unwrap(), addr);
    }
}
