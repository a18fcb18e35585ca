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

//! Shared wire primitives: length prefixes and fixed-length null bitmaps.

use crate::buffer::{Reader, Writer};
use crate::ensure;
use crate::error::UnmarshalError;

pub(crate) fn write_length(writer: &mut Writer, len: usize) {
    debug_assert!(len <= u32::MAX as usize);
    writer.write_varuint32(len as u32);
}

/// Reads a length prefix and rejects it against the remaining input before
/// the caller allocates anything sized by it. Every element costs at least
/// one byte on the wire, so a length beyond the remaining byte count can
/// only come from corrupt or hostile input.
pub(crate) fn read_length(reader: &mut Reader<'_>) -> Result<usize, UnmarshalError> {
    let length = reader.read_varuint32()? as usize;
    ensure!(
        length <= reader.remaining(),
        UnmarshalError::LengthOutOfBounds {
            length,
            remaining: reader.remaining(),
        }
    );
    Ok(length)
}

/// Fixed-length bit vector; bit `i` lives in byte `i / 8` at position
/// `i % 8`, least significant bit first. The bit count is never on the
/// wire — both peers derive it from the descriptor or the element count.
pub(crate) struct NullsBitmap {
    bits: usize,
    bytes: Vec<u8>,
}

impl NullsBitmap {
    pub fn new(bits: usize) -> Self {
        NullsBitmap {
            bits,
            bytes: vec![0; bits.div_ceil(8)],
        }
    }

    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.bits);
        self.bytes[index / 8] |= 1 << (index % 8);
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.bits);
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn write_to(&self, writer: &mut Writer) {
        writer.write_bytes(&self.bytes);
    }

    pub fn read_from(reader: &mut Reader<'_>, bits: usize) -> Result<Self, UnmarshalError> {
        let bytes = reader.read_bytes(bits.div_ceil(8))?.to_vec();
        Ok(NullsBitmap { bits, bytes })
    }
}
