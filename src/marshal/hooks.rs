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

//! Stream facades handed to custom per-layer hooks.
//!
//! A write hook may freely interleave [`HookWriter::write_default_fields`]
//! with raw extras and nested values; the matching read hook must mirror the
//! exact call sequence. Each facade carries its own borrow of the call
//! context, so nested hooks are ordinary call recursion with nothing to save
//! or restore.
//!
//! A read hook setting its own fields should hold its `borrow_mut` only
//! between facade calls — `read_default_fields` needs to reach the same
//! instance through the accessors.

use std::any::Any;
use std::sync::Arc;

use crate::descriptor::class::ClassDescriptor;
use crate::error::{MarshalError, UnmarshalError};
use crate::marshal::context::{ReadContext, WriteContext};
use crate::marshal::dispatch::{decode_bool, decode_char};
use crate::marshal::protocol;
use crate::marshal::Marshaller;
use crate::value::Value;

pub struct HookWriter<'a, 'w> {
    marshaller: &'a Marshaller,
    object: &'a dyn Any,
    layer: &'a Arc<ClassDescriptor>,
    ctx: &'a mut WriteContext<'w>,
}

impl<'a, 'w> HookWriter<'a, 'w> {
    pub(crate) fn new(
        marshaller: &'a Marshaller,
        object: &'a dyn Any,
        layer: &'a Arc<ClassDescriptor>,
        ctx: &'a mut WriteContext<'w>,
    ) -> Self {
        HookWriter {
            marshaller,
            object,
            layer,
            ctx,
        }
    }

    /// Emits the layer's default field encoding (null bitmap plus fields in
    /// descriptor order) at the current stream position.
    pub fn write_default_fields(&mut self) -> Result<(), MarshalError> {
        self.marshaller
            .default_write_fields(self.object, self.layer, self.ctx)
    }

    /// Writes an arbitrary value through the typed value dispatcher.
    pub fn write_value(&mut self, value: &Value) -> Result<(), MarshalError> {
        self.marshaller.write_value(value, None, false, self.ctx)
    }

    pub fn write_bool(&mut self, v: bool) {
        self.ctx.writer.write_u8(v as u8);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.ctx.writer.write_i8(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.ctx.writer.write_i16(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.ctx.writer.write_i32(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.ctx.writer.write_i64(v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.ctx.writer.write_f32(v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.ctx.writer.write_f64(v);
    }

    pub fn write_char(&mut self, v: char) {
        self.ctx.writer.write_u32(v as u32);
    }

    /// Raw length-prefixed UTF-8, outside the identity table.
    pub fn write_str(&mut self, s: &str) {
        protocol::write_length(self.ctx.writer, s.len());
        self.ctx.writer.write_bytes(s.as_bytes());
    }
}

pub struct HookReader<'a, 'r> {
    marshaller: &'a Marshaller,
    object: &'a dyn Any,
    layer: &'a Arc<ClassDescriptor>,
    ctx: &'a mut ReadContext<'r>,
}

impl<'a, 'r> HookReader<'a, 'r> {
    pub(crate) fn new(
        marshaller: &'a Marshaller,
        object: &'a dyn Any,
        layer: &'a Arc<ClassDescriptor>,
        ctx: &'a mut ReadContext<'r>,
    ) -> Self {
        HookReader {
            marshaller,
            object,
            layer,
            ctx,
        }
    }

    /// Consumes the layer's default field encoding and fills the instance.
    pub fn read_default_fields(&mut self) -> Result<(), UnmarshalError> {
        self.marshaller
            .default_fill_fields(self.object, self.layer, self.ctx)
    }

    pub fn read_value(&mut self) -> Result<Value, UnmarshalError> {
        self.marshaller.read_value(None, false, self.ctx)
    }

    pub fn read_bool(&mut self) -> Result<bool, UnmarshalError> {
        decode_bool(&mut self.ctx.reader)
    }

    pub fn read_i8(&mut self) -> Result<i8, UnmarshalError> {
        self.ctx.reader.read_i8()
    }

    pub fn read_i16(&mut self) -> Result<i16, UnmarshalError> {
        self.ctx.reader.read_i16()
    }

    pub fn read_i32(&mut self) -> Result<i32, UnmarshalError> {
        self.ctx.reader.read_i32()
    }

    pub fn read_i64(&mut self) -> Result<i64, UnmarshalError> {
        self.ctx.reader.read_i64()
    }

    pub fn read_f32(&mut self) -> Result<f32, UnmarshalError> {
        self.ctx.reader.read_f32()
    }

    pub fn read_f64(&mut self) -> Result<f64, UnmarshalError> {
        self.ctx.reader.read_f64()
    }

    pub fn read_char(&mut self) -> Result<char, UnmarshalError> {
        decode_char(&mut self.ctx.reader)
    }

    pub fn read_str(&mut self) -> Result<String, UnmarshalError> {
        let len = protocol::read_length(&mut self.ctx.reader)?;
        let bytes = self.ctx.reader.read_bytes(len)?.to_vec();
        String::from_utf8(bytes)
            .map_err(|_| UnmarshalError::invalid_data("string payload is not valid UTF-8"))
    }
}
