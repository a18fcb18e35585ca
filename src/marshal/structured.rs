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

//! (Un)marshalling of objects that have structure (fields), layer by layer
//! along the class lineage, most ancestral layer first.
//!
//! Per layer the encoding is either the class's custom hook or the default
//! field pass: a null bitmap over the layer's reference-typed fields, then
//! every remaining field in descriptor order — primitives as bare
//! fixed-width values through the fast accessors, references through the
//! typed value dispatcher. Encode and decode must visit fields in
//! byte-identical order; the default path carries no field tags, so any
//! divergence corrupts the rest of the stream.

use std::any::Any;
use std::sync::Arc;

use crate::descriptor::class::{lineage, ClassDescriptor};
use crate::descriptor::field::FieldAccessor;
use crate::error::{MarshalError, UnmarshalError};
use crate::marshal::context::{ReadContext, WriteContext};
use crate::marshal::dispatch::{decode_bool, decode_char};
use crate::marshal::hooks::{HookReader, HookWriter};
use crate::marshal::protocol::NullsBitmap;
use crate::marshal::Marshaller;
use crate::value::{ObjHandle, Value};

impl Marshaller {
    pub(crate) fn write_structured(
        &self,
        object: &dyn Any,
        descriptor: &Arc<ClassDescriptor>,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        for layer in lineage(descriptor) {
            self.write_structured_layer(object, layer, ctx)?;
        }
        Ok(())
    }

    fn write_structured_layer(
        &self,
        object: &dyn Any,
        layer: &Arc<ClassDescriptor>,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        if layer.has_write_hook() {
            self.write_with_hook(object, layer, ctx)?;
        } else {
            self.default_write_fields(object, layer, ctx)?;
        }
        ctx.add_used_descriptor(layer);
        Ok(())
    }

    fn write_with_hook(
        &self,
        object: &dyn Any,
        layer: &Arc<ClassDescriptor>,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        let hook = layer.write_hook().expect("checked by caller");
        let mut stream = HookWriter::new(self, object, layer, ctx);
        hook(object, &mut stream).map_err(|source| MarshalError::WriteHook {
            class: layer.name().to_string(),
            source,
        })
    }

    pub(crate) fn default_write_fields(
        &self,
        object: &dyn Any,
        layer: &ClassDescriptor,
        ctx: &mut WriteContext<'_>,
    ) -> Result<(), MarshalError> {
        let bitmap = write_nulls_bitmap(object, layer, ctx);

        for (index, field) in layer.fields().iter().enumerate() {
            match field.accessor() {
                FieldAccessor::Bool(a) => ctx.writer.write_u8((a.get)(object) as u8),
                FieldAccessor::I8(a) => ctx.writer.write_i8((a.get)(object)),
                FieldAccessor::I16(a) => ctx.writer.write_i16((a.get)(object)),
                FieldAccessor::I32(a) => ctx.writer.write_i32((a.get)(object)),
                FieldAccessor::I64(a) => ctx.writer.write_i64((a.get)(object)),
                FieldAccessor::F32(a) => ctx.writer.write_f32((a.get)(object)),
                FieldAccessor::F64(a) => ctx.writer.write_f64((a.get)(object)),
                FieldAccessor::Char(a) => ctx.writer.write_u32((a.get)(object) as u32),
                FieldAccessor::Ref(a) => {
                    let written_as_null = layer
                        .bitmap_slot(index)
                        .is_some_and(|slot| bitmap.as_ref().expect("slot implies bitmap").get(slot));
                    if !written_as_null {
                        let value = (a.get)(object);
                        let ref_type = field.ref_type().expect("ref accessor implies ref type");
                        self.write_value(&value, Some(ref_type), field.is_unshared(), ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn pre_instantiate_structured(
        &self,
        descriptor: &ClassDescriptor,
    ) -> Result<ObjHandle, UnmarshalError> {
        Ok(self.instantiation.instantiate(descriptor)?)
    }

    /// Decodes one structured object: blank instance first, registered in
    /// the identity table before any field is filled so a back-reference to
    /// an object still under construction resolves.
    pub(crate) fn read_structured(
        &self,
        descriptor: &Arc<ClassDescriptor>,
        register: bool,
        ctx: &mut ReadContext<'_>,
    ) -> Result<Value, UnmarshalError> {
        let handle = self.pre_instantiate_structured(descriptor)?;
        let value = Value::Object(handle.clone());
        if register {
            ctx.ref_reader.store(value.clone());
        }
        self.fill_structured_from(&*handle, descriptor, ctx)?;
        Ok(value)
    }

    pub(crate) fn fill_structured_from(
        &self,
        object: &dyn Any,
        descriptor: &Arc<ClassDescriptor>,
        ctx: &mut ReadContext<'_>,
    ) -> Result<(), UnmarshalError> {
        for layer in lineage(descriptor) {
            self.fill_structured_layer_from(object, layer, ctx)?;
        }
        Ok(())
    }

    fn fill_structured_layer_from(
        &self,
        object: &dyn Any,
        layer: &Arc<ClassDescriptor>,
        ctx: &mut ReadContext<'_>,
    ) -> Result<(), UnmarshalError> {
        if layer.has_read_hook() {
            self.fill_with_hook(object, layer, ctx)
        } else {
            self.default_fill_fields(object, layer, ctx)
        }
    }

    fn fill_with_hook(
        &self,
        object: &dyn Any,
        layer: &Arc<ClassDescriptor>,
        ctx: &mut ReadContext<'_>,
    ) -> Result<(), UnmarshalError> {
        let hook = layer.read_hook().expect("checked by caller");
        let mut stream = HookReader::new(self, object, layer, ctx);
        hook(object, &mut stream).map_err(|source| UnmarshalError::ReadHook {
            class: layer.name().to_string(),
            source,
        })
    }

    pub(crate) fn default_fill_fields(
        &self,
        object: &dyn Any,
        layer: &ClassDescriptor,
        ctx: &mut ReadContext<'_>,
    ) -> Result<(), UnmarshalError> {
        let bitmap = read_nulls_bitmap(layer, ctx)?;

        for (index, field) in layer.fields().iter().enumerate() {
            match field.accessor() {
                FieldAccessor::Bool(a) => (a.set)(object, decode_bool(&mut ctx.reader)?),
                FieldAccessor::I8(a) => (a.set)(object, ctx.reader.read_i8()?),
                FieldAccessor::I16(a) => (a.set)(object, ctx.reader.read_i16()?),
                FieldAccessor::I32(a) => (a.set)(object, ctx.reader.read_i32()?),
                FieldAccessor::I64(a) => (a.set)(object, ctx.reader.read_i64()?),
                FieldAccessor::F32(a) => (a.set)(object, ctx.reader.read_f32()?),
                FieldAccessor::F64(a) => (a.set)(object, ctx.reader.read_f64()?),
                FieldAccessor::Char(a) => (a.set)(object, decode_char(&mut ctx.reader)?),
                FieldAccessor::Ref(a) => {
                    let skipped_as_null = layer
                        .bitmap_slot(index)
                        .is_some_and(|slot| bitmap.as_ref().expect("slot implies bitmap").get(slot));
                    if skipped_as_null {
                        (a.set)(object, Value::Null);
                    } else {
                        let ref_type = field.ref_type().expect("ref accessor implies ref type");
                        let value = self.read_value(Some(ref_type), field.is_unshared(), ctx)?;
                        (a.set)(object, value);
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_nulls_bitmap(
    object: &dyn Any,
    layer: &ClassDescriptor,
    ctx: &mut WriteContext<'_>,
) -> Option<NullsBitmap> {
    if layer.nulls_bitmap_len() == 0 {
        return None;
    }
    let mut bitmap = NullsBitmap::new(layer.nulls_bitmap_len());
    for (index, field) in layer.fields().iter().enumerate() {
        if let Some(slot) = layer.bitmap_slot(index) {
            if let FieldAccessor::Ref(a) = field.accessor() {
                if (a.get)(object).is_null() {
                    bitmap.set(slot);
                }
            }
        }
    }
    bitmap.write_to(ctx.writer);
    Some(bitmap)
}

fn read_nulls_bitmap(
    layer: &ClassDescriptor,
    ctx: &mut ReadContext<'_>,
) -> Result<Option<NullsBitmap>, UnmarshalError> {
    if layer.nulls_bitmap_len() == 0 {
        return Ok(None);
    }
    NullsBitmap::read_from(&mut ctx.reader, layer.nulls_bitmap_len()).map(Some)
}
