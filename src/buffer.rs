// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Binary buffer management. All multi-byte values are little-endian.
//!
//! `Writer` appends to a growable byte vector and cannot fail; `Reader`
//! walks a borrowed slice and bounds-checks every access, so corrupt or
//! truncated input surfaces as an error instead of a panic.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::UnmarshalError;

#[derive(Default)]
pub struct Writer {
    bf: Vec<u8>,
}

impl Writer {
    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.bf.reserve(additional);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bf
    }

    pub fn dump(&self) -> Vec<u8> {
        self.bf.clone()
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.bf.extend_from_slice(v);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bf.write_u8(value).unwrap();
    }

    pub fn write_i8(&mut self, value: i8) {
        self.bf.write_i8(value).unwrap();
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bf.write_i16::<LittleEndian>(value).unwrap();
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bf.write_i32::<LittleEndian>(value).unwrap();
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bf.write_i64::<LittleEndian>(value).unwrap();
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bf.write_u32::<LittleEndian>(value).unwrap();
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bf.write_f32::<LittleEndian>(value).unwrap();
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bf.write_f64::<LittleEndian>(value).unwrap();
    }

    /// 7-bit groups, least significant first, high bit marks continuation.
    pub fn write_varuint32(&mut self, mut value: u32) {
        while value >= 0x80 {
            self.write_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.write_u8(value as u8);
    }
}

pub struct Reader<'bf> {
    bf: &'bf [u8],
    cursor: usize,
}

impl<'bf> Reader<'bf> {
    pub fn new(bf: &'bf [u8]) -> Reader<'bf> {
        Reader { bf, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bf.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn take(&mut self, len: usize) -> Result<&'bf [u8], UnmarshalError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(UnmarshalError::Truncated {
                need: len - remaining,
                remaining,
            });
        }
        let slice = &self.bf[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'bf [u8], UnmarshalError> {
        self.take(len)
    }

    pub fn read_u8(&mut self) -> Result<u8, UnmarshalError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, UnmarshalError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, UnmarshalError> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, UnmarshalError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, UnmarshalError> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, UnmarshalError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, UnmarshalError> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, UnmarshalError> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    pub fn read_varuint32(&mut self) -> Result<u32, UnmarshalError> {
        let mut result: u32 = 0;
        for shift in (0..35).step_by(7) {
            let b = self.read_u8()?;
            // the fifth byte may only carry the top four bits
            if shift == 28 && b > 0x0F {
                return Err(UnmarshalError::invalid_data("varuint32 overflows 32 bits"));
            }
            result |= ((b & 0x7F) as u32) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        unreachable!("varuint32 loop covers at most five bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varuint32_round_trip() {
        let values = [0u32, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, u32::MAX];
        let mut writer = Writer::default();
        for v in values {
            writer.write_varuint32(v);
        }
        let bytes = writer.into_vec();
        let mut reader = Reader::new(&bytes);
        for v in values {
            assert_eq!(reader.read_varuint32().unwrap(), v);
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn varuint32_boundary_sizes() {
        for (value, size) in [(0x7Fu32, 1usize), (0x80, 2), (0x3FFF, 2), (0x4000, 3)] {
            let mut writer = Writer::default();
            writer.write_varuint32(value);
            assert_eq!(writer.len(), size, "value {value:#x}");
        }
    }

    #[test]
    fn truncated_read_is_rejected() {
        let mut reader = Reader::new(&[1, 2]);
        let err = reader.read_i32().unwrap_err();
        assert!(matches!(
            err,
            UnmarshalError::Truncated {
                need: 2,
                remaining: 2
            }
        ));
    }

    #[test]
    fn varuint32_overflow_is_rejected() {
        let mut reader = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(matches!(
            reader.read_varuint32(),
            Err(UnmarshalError::InvalidData(_))
        ));
    }

    #[test]
    fn fixed_width_round_trip() {
        let mut writer = Writer::default();
        writer.write_i8(-5);
        writer.write_i16(-300);
        writer.write_i32(123_456);
        writer.write_i64(-9_000_000_000);
        writer.write_f32(1.5);
        writer.write_f64(-2.25);
        let bytes = writer.into_vec();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_i8().unwrap(), -5);
        assert_eq!(reader.read_i16().unwrap(), -300);
        assert_eq!(reader.read_i32().unwrap(), 123_456);
        assert_eq!(reader.read_i64().unwrap(), -9_000_000_000);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -2.25);
    }
}
