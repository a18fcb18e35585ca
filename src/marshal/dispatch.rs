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

//! The typed value dispatcher: the polymorphic entry point every reference
//! value goes through.
//!
//! A value is prefixed with a reference flag (null marker, back-reference
//! token, inline marker or first-occurrence marker) and, when the reader
//! could not infer the runtime type from the declared one, a value tag.
//! Declared types that are *known upfront* — boxed primitives, strings,
//! sealed classes and arrays of such components — elide the tag; boxed
//! primitives under a known-upfront declaration elide the flag as well and
//! are written as bare payloads.

use crate::buffer::Reader;
use crate::ensure;
use crate::error::{MarshalError, UnmarshalError};
use crate::marshal::context::{ReadContext, WriteContext};
use crate::marshal::Marshaller;
use crate::types::{PrimitiveType, RefFlag, RefType, ValueTag, FIRST_CLASS_ID};
use crate::value::Value;

pub(crate) fn decode_bool(reader: &mut Reader<'_>) -> Result<bool, UnmarshalError> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(UnmarshalError::invalid_data(format!(
            "invalid bool byte {b}"
        ))),
    }
}

pub(crate) fn decode_char(reader: &mut Reader<'_>) -> Result<char, UnmarshalError> {
    let raw = reader.read_u32()?;
    char::from_u32(raw)
        .ok_or_else(|| UnmarshalError::invalid_data(format!("invalid char scalar {raw:#x}")))
}

fn prim_type_of(value: &Value) -> Option<PrimitiveType> {
    match value {
        Value::Bool(_) => Some(PrimitiveType::Bool),
        Value::I8(_) => Some(PrimitiveType::I8),
        Value::I16(_) => Some(PrimitiveType::I16),
        Value::I32(_) => Some(PrimitiveType::I32),
        Value::I64(_) => Some(PrimitiveType::I64),
        Value::F32(_) => Some(PrimitiveType::F32),
        Value::F64(_) => Some(PrimitiveType::F64),
        Value::Char(_) => Some(PrimitiveType::Char),
        _ => None,
    }
}

impl Marshaller {
    /// Whether a field or component declared as `ref_type` can only hold
    /// runtime values of exactly that type, so no tag is needed on the wire.
    pub(crate) fn runtime_type_known_upfront(&self, ref_type: &RefType) -> bool {
        match ref_type {
            RefType::Boxed(_) | RefType::Str => true,
            RefType::Array(component) => self.runtime_type_known_upfront(component),
            RefType::Class(id) => self
                .registry
                .by_class_id(*id)
                .is_some_and(|d| d.is_sealed()),
            RefType::List | RefType::Set | RefType::Map | RefType::Dyn => false,
        }
    }

    pub(crate) fn write_value(
        &self,
        value: &Value,
        declared: Option<&RefType>,
        unshared: bool,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        let known_upfront = declared.is_some_and(|d| self.runtime_type_known_upfront(d));

        if value.is_null() {
            // slots with a known-upfront declaration are covered by a null
            // bitmap upstream and never reach the dispatcher as null
            if known_upfront {
                return Err(MarshalError::internal(
                    "null value in a slot its null bitmap already covers",
                ));
            }
            ctx.writer.write_i8(RefFlag::Null as i8);
            return Ok(());
        }

        if let Some(RefType::Boxed(prim)) = declared {
            return self.write_boxed_prim(value, *prim, ctx);
        }

        match value.identity_ptr() {
            Some(ptr) if !unshared => {
                if ctx.ref_writer.try_write_ref(&mut *ctx.writer, ptr) {
                    return Ok(());
                }
            }
            _ => ctx.writer.write_i8(RefFlag::NotNullValue as i8),
        }

        self.write_body(value, declared, known_upfront, ctx)
    }

    fn write_boxed_prim(
        &self,
        value: &Value,
        prim: PrimitiveType,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        let actual = prim_type_of(value).ok_or_else(|| MarshalError::TypeMismatch {
            expected: format!("{prim:?}").into(),
            found: value.kind_name().into(),
        })?;
        ensure!(
            actual == prim,
            MarshalError::TypeMismatch {
                expected: format!("{prim:?}").into(),
                found: value.kind_name().into(),
            }
        );
        self.write_prim_payload(value, ctx);
        Ok(())
    }

    fn write_prim_payload(&self, value: &Value, ctx: &mut WriteContext<'_>) {
        match value {
            Value::Bool(v) => ctx.writer.write_u8(*v as u8),
            Value::I8(v) => ctx.writer.write_i8(*v),
            Value::I16(v) => ctx.writer.write_i16(*v),
            Value::I32(v) => ctx.writer.write_i32(*v),
            Value::I64(v) => ctx.writer.write_i64(*v),
            Value::F32(v) => ctx.writer.write_f32(*v),
            Value::F64(v) => ctx.writer.write_f64(*v),
            Value::Char(v) => ctx.writer.write_u32(*v as u32),
            _ => unreachable!("guarded by prim_type_of"),
        }
    }

    fn write_body(
        &self,
        value: &Value,
        declared: Option<&RefType>,
        known_upfront: bool,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        match value {
            Value::Null => unreachable!("handled by write_value"),
            Value::Bool(_)
            | Value::I8(_)
            | Value::I16(_)
            | Value::I32(_)
            | Value::I64(_)
            | Value::F32(_)
            | Value::F64(_)
            | Value::Char(_) => {
                let prim = prim_type_of(value).expect("primitive arm");
                ctx.writer.write_varuint32(prim.tag() as u32);
                self.write_prim_payload(value, ctx);
                Ok(())
            }
            Value::Str(s) => {
                if known_upfront {
                    ensure!(
                        declared == Some(&RefType::Str),
                        MarshalError::TypeMismatch {
                            expected: format!("{:?}", declared.expect("known upfront")).into(),
                            found: "string".into(),
                        }
                    );
                } else {
                    ctx.writer.write_varuint32(ValueTag::STRING as u32);
                }
                crate::marshal::protocol::write_length(ctx.writer, s.len());
                ctx.writer.write_bytes(s.as_bytes());
                Ok(())
            }
            Value::Object(handle) => {
                let descriptor = self
                    .registry
                    .by_instance_type((**handle).type_id())
                    .ok_or_else(|| {
                        MarshalError::UnregisteredClass(
                            format!("{:?}", (**handle).type_id()).into(),
                        )
                    })?
                    .clone();
                if known_upfront {
                    if let Some(RefType::Class(id)) = declared {
                        ensure!(
                            descriptor.class_id() == *id,
                            MarshalError::TypeMismatch {
                                expected: format!("class {id}").into(),
                                found: format!("class {}", descriptor.class_id()).into(),
                            }
                        );
                    }
                } else {
                    ctx.writer.write_varuint32(descriptor.class_id());
                }
                self.write_structured(&**handle, &descriptor, ctx)
            }
            Value::Array(handle) => {
                if !known_upfront {
                    ctx.writer.write_varuint32(ValueTag::ARRAY as u32);
                }
                let array = handle.borrow();
                self.write_array(&array, ctx)
            }
            Value::List(handle) => {
                let list = handle.borrow();
                self.write_list(&list, ctx)
            }
            Value::Set(handle) => {
                let set = handle.borrow();
                self.write_set(&set, ctx)
            }
            Value::Map(handle) => {
                let map = handle.borrow();
                self.write_map(&map, ctx)
            }
        }
    }

    pub(crate) fn read_value(
        &self,
        declared: Option<&RefType>,
        unshared: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        ctx.inc_depth()?;
        let result = self.read_value_inner(declared, unshared, ctx);
        ctx.dec_depth();
        result
    }

    fn read_value_inner(
        &self,
        declared: Option<&RefType>,
        unshared: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        if let Some(RefType::Boxed(prim)) = declared {
            return self.read_prim_payload(*prim, ctx);
        }
        let known_upfront = declared.is_some_and(|d| self.runtime_type_known_upfront(d));

        let flag_byte = ctx.reader.read_i8()?;
        let flag =
            RefFlag::try_from(flag_byte).map_err(|_| UnmarshalError::BadRefFlag(flag_byte))?;
        match flag {
            RefFlag::Null => {
                ensure!(
                    !known_upfront,
                    UnmarshalError::invalid_data(
                        "null marker in a slot whose null bitmap bit was clear"
                    )
                );
                Ok(Value::Null)
            }
            RefFlag::Ref => {
                ensure!(
                    !unshared,
                    UnmarshalError::invalid_data("back-reference token in an unshared slot")
                );
                let token = ctx.reader.read_varuint32()?;
                ctx.ref_reader
                    .get(token)
                    .ok_or(UnmarshalError::BadBackRef(token))
            }
            RefFlag::NotNullValue => self.read_body(declared, known_upfront, false, ctx),
            RefFlag::RefValue => {
                ensure!(
                    !unshared,
                    UnmarshalError::invalid_data("shared value marker in an unshared slot")
                );
                self.read_body(declared, known_upfront, true, ctx)
            }
        }
    }

    fn read_prim_payload(
        &self,
        prim: PrimitiveType,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        Ok(match prim {
            PrimitiveType::Bool => Value::Bool(decode_bool(&mut ctx.reader)?),
            PrimitiveType::I8 => Value::I8(ctx.reader.read_i8()?),
            PrimitiveType::I16 => Value::I16(ctx.reader.read_i16()?),
            PrimitiveType::I32 => Value::I32(ctx.reader.read_i32()?),
            PrimitiveType::I64 => Value::I64(ctx.reader.read_i64()?),
            PrimitiveType::F32 => Value::F32(ctx.reader.read_f32()?),
            PrimitiveType::F64 => Value::F64(ctx.reader.read_f64()?),
            PrimitiveType::Char => Value::Char(decode_char(&mut ctx.reader)?),
        })
    }

    fn read_body(
        &self,
        declared: Option<&RefType>,
        known_upfront: bool,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        if known_upfront {
            return match declared.expect("known upfront implies a declared type") {
                RefType::Str => self.read_str(register, ctx),
                RefType::Class(id) => {
                    let descriptor = self
                        .registry
                        .by_class_id(*id)
                        .ok_or(UnmarshalError::UnknownClassId(*id))?
                        .clone();
                    self.read_structured(&descriptor, register, ctx)
                }
                RefType::Array(_) => self.read_array(register, ctx),
                other => unreachable!("{other:?} is never known upfront"),
            };
        }

        let raw_tag = ctx.reader.read_varuint32()?;
        if raw_tag >= FIRST_CLASS_ID {
            let descriptor = self
                .registry
                .by_class_id(raw_tag)
                .ok_or(UnmarshalError::UnknownClassId(raw_tag))?
                .clone();
            return self.read_structured(&descriptor, register, ctx);
        }
        let tag = ValueTag::try_from(raw_tag).map_err(|_| UnmarshalError::BadValueTag(raw_tag))?;
        match tag {
            ValueTag::BOOL => self.finish_prim(PrimitiveType::Bool, register, ctx),
            ValueTag::INT8 => self.finish_prim(PrimitiveType::I8, register, ctx),
            ValueTag::INT16 => self.finish_prim(PrimitiveType::I16, register, ctx),
            ValueTag::INT32 => self.finish_prim(PrimitiveType::I32, register, ctx),
            ValueTag::INT64 => self.finish_prim(PrimitiveType::I64, register, ctx),
            ValueTag::FLOAT32 => self.finish_prim(PrimitiveType::F32, register, ctx),
            ValueTag::FLOAT64 => self.finish_prim(PrimitiveType::F64, register, ctx),
            ValueTag::CHAR => self.finish_prim(PrimitiveType::Char, register, ctx),
            ValueTag::STRING => self.read_str(register, ctx),
            ValueTag::ARRAY => self.read_array(register, ctx),
            ValueTag::VEC_LIST => self.read_list(crate::types::ListKind::Vec, register, ctx),
            ValueTag::LINKED_LIST => self.read_list(crate::types::ListKind::Linked, register, ctx),
            ValueTag::SINGLETON_LIST => self.read_singleton_list(register, ctx),
            ValueTag::HASH_SET => self.read_set(crate::types::SetKind::Hash, register, ctx),
            ValueTag::LINKED_HASH_SET => {
                self.read_set(crate::types::SetKind::Ordered, register, ctx)
            }
            ValueTag::HASH_MAP => self.read_map(crate::types::MapKind::Hash, register, ctx),
            ValueTag::LINKED_HASH_MAP => {
                self.read_map(crate::types::MapKind::Ordered, register, ctx)
            }
            // the dynamic tag only ever appears in array component positions
            ValueTag::DYNAMIC => Err(UnmarshalError::BadValueTag(raw_tag)),
        }
    }

    fn finish_prim(
        &self,
        prim: PrimitiveType,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let value = self.read_prim_payload(prim, ctx)?;
        if register {
            ctx.ref_reader.store(value.clone());
        }
        Ok(value)
    }

    pub(crate) fn read_str(
        &self,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let len = crate::marshal::protocol::read_length(&mut ctx.reader)?;
        let bytes = ctx.reader.read_bytes(len)?.to_vec();
        let s = String::from_utf8(bytes)
            .map_err(|_| UnmarshalError::invalid_data("string payload is not valid UTF-8"))?;
        let value = Value::str(s);
        if register {
            ctx.ref_reader.store(value.clone());
        }
        Ok(value)
    }
}
