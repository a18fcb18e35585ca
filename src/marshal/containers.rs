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

//! Codecs for built-in containers.
//!
//! Arrays carry their component type and, when the component's runtime type
//! is known upfront, one null bitmap across all elements instead of
//! per-element null markers. The mutable list/set/map kinds are a fixed
//! closed set decoded by a generic algorithm: read a validated length,
//! create an empty container of the matching kind, fill it element by
//! element through the untyped dispatcher. A singleton list has implicit
//! length one and encodes only its element.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{MarshalError, UnmarshalError};
use crate::marshal::context::{ReadContext, WriteContext};
use crate::marshal::protocol::{self, NullsBitmap};
use crate::marshal::Marshaller;
use crate::types::{ListKind, MapKind, PrimitiveType, RefType, SetKind, ValueTag, FIRST_CLASS_ID};
use crate::value::{ArrayValue, ListValue, MapValue, SetValue, Value};

impl Marshaller {
    pub(crate) fn write_array(
        &self,
        array: &ArrayValue,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        self.write_component_type(&array.component, ctx);
        protocol::write_length(ctx.writer, array.elems.len());

        if self.runtime_type_known_upfront(&array.component) && !array.elems.is_empty() {
            let mut bitmap = NullsBitmap::new(array.elems.len());
            for (i, elem) in array.elems.iter().enumerate() {
                if elem.is_null() {
                    bitmap.set(i);
                }
            }
            bitmap.write_to(ctx.writer);
            for elem in &array.elems {
                if !elem.is_null() {
                    self.write_value(elem, Some(&array.component), false, ctx)?;
                }
            }
        } else {
            for elem in &array.elems {
                self.write_value(elem, Some(&array.component), false, ctx)?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_array(
        &self,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let component = self.read_component_type(ctx)?;
        let len = protocol::read_length(&mut ctx.reader)?;
        let handle = Rc::new(RefCell::new(ArrayValue {
            component: component.clone(),
            elems: vec![Value::Null; len],
        }));
        let value = Value::Array(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }

        if self.runtime_type_known_upfront(&component) && len > 0 {
            let bitmap = NullsBitmap::read_from(&mut ctx.reader, len)?;
            for i in 0..len {
                if !bitmap.get(i) {
                    let elem = self.read_value(Some(&component), false, ctx)?;
                    handle.borrow_mut().elems[i] = elem;
                }
            }
        } else {
            for i in 0..len {
                let elem = self.read_value(Some(&component), false, ctx)?;
                handle.borrow_mut().elems[i] = elem;
            }
        }
        Ok(value)
    }

    /// Component type identity, written in the value-tag space. Container
    /// components degrade to the dynamic tag: their elements always carry
    /// their own tags anyway.
    fn write_component_type(&self, component: &RefType, ctx: &mut WriteContext<'_>) {
        match component {
            RefType::Boxed(prim) => ctx.writer.write_varuint32(prim.tag() as u32),
            RefType::Str => ctx.writer.write_varuint32(ValueTag::STRING as u32),
            RefType::Class(id) => ctx.writer.write_varuint32(*id),
            RefType::Array(inner) => {
                ctx.writer.write_varuint32(ValueTag::ARRAY as u32);
                self.write_component_type(inner, ctx);
            }
            RefType::List | RefType::Set | RefType::Map | RefType::Dyn => {
                ctx.writer.write_varuint32(ValueTag::DYNAMIC as u32)
            }
        }
    }

    fn read_component_type(&self, ctx: &mut ReadContext<'_>) -> Result<RefType, UnmarshalError> {
        let raw = ctx.reader.read_varuint32()?;
        if raw >= FIRST_CLASS_ID {
            if self.registry.by_class_id(raw).is_none() {
                return Err(UnmarshalError::UnknownClassId(raw));
            }
            return Ok(RefType::Class(raw));
        }
        let tag = ValueTag::try_from(raw).map_err(|_| UnmarshalError::BadValueTag(raw))?;
        Ok(match tag {
            ValueTag::BOOL => RefType::Boxed(PrimitiveType::Bool),
            ValueTag::INT8 => RefType::Boxed(PrimitiveType::I8),
            ValueTag::INT16 => RefType::Boxed(PrimitiveType::I16),
            ValueTag::INT32 => RefType::Boxed(PrimitiveType::I32),
            ValueTag::INT64 => RefType::Boxed(PrimitiveType::I64),
            ValueTag::FLOAT32 => RefType::Boxed(PrimitiveType::F32),
            ValueTag::FLOAT64 => RefType::Boxed(PrimitiveType::F64),
            ValueTag::CHAR => RefType::Boxed(PrimitiveType::Char),
            ValueTag::STRING => RefType::Str,
            ValueTag::ARRAY => RefType::Array(Box::new(self.read_component_type(ctx)?)),
            ValueTag::DYNAMIC => RefType::Dyn,
            _ => return Err(UnmarshalError::BadValueTag(raw)),
        })
    }

    pub(crate) fn write_list(
        &self,
        list: &ListValue,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        ctx.writer.write_varuint32(list.kind.tag() as u32);
        if list.kind == ListKind::Singleton {
            if list.elems.len() != 1 {
                return Err(MarshalError::BadSingletonList(list.elems.len()));
            }
            return self.write_value(&list.elems[0], None, false, ctx);
        }
        protocol::write_length(ctx.writer, list.elems.len());
        for elem in &list.elems {
            self.write_value(elem, None, false, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn read_list(
        &self,
        kind: ListKind,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let len = protocol::read_length(&mut ctx.reader)?;
        let handle = Rc::new(RefCell::new(ListValue {
            kind,
            elems: Vec::with_capacity(len),
        }));
        let value = Value::List(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }
        for _ in 0..len {
            let elem = self.read_value(None, false, ctx)?;
            handle.borrow_mut().elems.push(elem);
        }
        Ok(value)
    }

    pub(crate) fn read_singleton_list(
        &self,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let handle = Rc::new(RefCell::new(ListValue {
            kind: ListKind::Singleton,
            elems: Vec::with_capacity(1),
        }));
        let value = Value::List(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }
        let elem = self.read_value(None, false, ctx)?;
        handle.borrow_mut().elems.push(elem);
        Ok(value)
    }

    pub(crate) fn write_set(
        &self,
        set: &SetValue,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        ctx.writer.write_varuint32(set.kind.tag() as u32);
        protocol::write_length(ctx.writer, set.elems.len());
        for elem in &set.elems {
            self.write_value(elem, None, false, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn read_set(
        &self,
        kind: SetKind,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let len = protocol::read_length(&mut ctx.reader)?;
        let handle = Rc::new(RefCell::new(SetValue {
            kind,
            elems: Vec::with_capacity(len),
        }));
        let value = Value::Set(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }
        for _ in 0..len {
            let elem = self.read_value(None, false, ctx)?;
            handle.borrow_mut().elems.push(elem);
        }
        Ok(value)
    }

    pub(crate) fn write_map(
        &self,
        map: &MapValue,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        ctx.writer.write_varuint32(map.kind.tag() as u32);
        protocol::write_length(ctx.writer, map.entries.len());
        for (key, value) in &map.entries {
            self.write_value(key, None, false, ctx)?;
            self.write_value(value, None, false, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn read_map(
        &self,
        kind: MapKind,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let len = protocol::read_length(&mut ctx.reader)?;
        let handle = Rc::new(RefCell::new(MapValue {
            kind,
            entries: Vec::with_capacity(len),
        }));
        let value = Value::Map(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }
        for _ in 0..len {
            let key = self.read_value(None, false, ctx)?;
            let val = self.read_value(None, false, ctx)?;
            handle.borrow_mut().entries.push((key, val));
        }
        Ok(value)
    }
}
