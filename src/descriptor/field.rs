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

use std::any::Any;
use std::cell::RefCell;

use crate::types::{FieldType, PrimitiveType, RefType};
use crate::value::Value;

fn cell_of<T: 'static>(object: &dyn Any) -> &RefCell<T> {
    object
        .downcast_ref::<RefCell<T>>()
        .expect("field accessor bound to a different class")
}

/// A get/set pair resolved once at descriptor build time and bound to one
/// field of one concrete type.
pub struct PrimAccessor<P> {
    pub(crate) get: Box<dyn Fn(&dyn Any) -> P + Send + Sync>,
    pub(crate) set: Box<dyn Fn(&dyn Any, P) + Send + Sync>,
}

pub struct RefAccessor {
    pub(crate) get: Box<dyn Fn(&dyn Any) -> Value + Send + Sync>,
    pub(crate) set: Box<dyn Fn(&dyn Any, Value) + Send + Sync>,
}

/// Capability for reading and writing one field on an erased instance.
///
/// Primitive variants move raw machine values and never box them through
/// [`Value`]; the `Ref` variant carries the dynamic value of a nullable
/// reference field.
pub enum FieldAccessor {
    Bool(PrimAccessor<bool>),
    I8(PrimAccessor<i8>),
    I16(PrimAccessor<i16>),
    I32(PrimAccessor<i32>),
    I64(PrimAccessor<i64>),
    F32(PrimAccessor<f32>),
    F64(PrimAccessor<f64>),
    Char(PrimAccessor<char>),
    Ref(RefAccessor),
}

macro_rules! prim_accessor_ctor {
    ($(($fn_name:ident, $variant:ident, $ty:ty)),* $(,)?) => {
        $(
            pub fn $fn_name<T: 'static>(get: fn(&T) -> $ty, set: fn(&mut T, $ty)) -> FieldAccessor {
                FieldAccessor::$variant(PrimAccessor {
                    get: Box::new(move |object| get(&cell_of::<T>(object).borrow())),
                    set: Box::new(move |object, v| set(&mut cell_of::<T>(object).borrow_mut(), v)),
                })
            }
        )*
    };
}

impl FieldAccessor {
    prim_accessor_ctor!(
        (of_bool, Bool, bool),
        (of_i8, I8, i8),
        (of_i16, I16, i16),
        (of_i32, I32, i32),
        (of_i64, I64, i64),
        (of_f32, F32, f32),
        (of_f64, F64, f64),
        (of_char, Char, char),
    );

    /// Binds a reference-typed field. The getter surfaces the field as a
    /// [`Value`] (`Value::Null` for an empty field); the setter is expected
    /// to accept whatever the wire produced for the declared type.
    pub fn of_ref<T: 'static>(get: fn(&T) -> Value, set: fn(&mut T, Value)) -> FieldAccessor {
        FieldAccessor::Ref(RefAccessor {
            get: Box::new(move |object| get(&cell_of::<T>(object).borrow())),
            set: Box::new(move |object, v| set(&mut cell_of::<T>(object).borrow_mut(), v)),
        })
    }

    fn prim_kind(&self) -> Option<PrimitiveType> {
        match self {
            FieldAccessor::Bool(_) => Some(PrimitiveType::Bool),
            FieldAccessor::I8(_) => Some(PrimitiveType::I8),
            FieldAccessor::I16(_) => Some(PrimitiveType::I16),
            FieldAccessor::I32(_) => Some(PrimitiveType::I32),
            FieldAccessor::I64(_) => Some(PrimitiveType::I64),
            FieldAccessor::F32(_) => Some(PrimitiveType::F32),
            FieldAccessor::F64(_) => Some(PrimitiveType::F64),
            FieldAccessor::Char(_) => Some(PrimitiveType::Char),
            FieldAccessor::Ref(_) => None,
        }
    }
}

/// Immutable per-field wire metadata plus the bound accessor.
///
/// Identity is (declaring class, name); instances are built once per class
/// descriptor and shared across all instances of that class.
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    unshared: bool,
    accessor: FieldAccessor,
}

impl FieldDescriptor {
    /// A directly stored, non-nullable primitive field.
    ///
    /// Panics if the accessor variant does not match `primitive`; pairing
    /// them wrongly is a registration bug, not a runtime condition.
    pub fn primitive(name: &str, primitive: PrimitiveType, accessor: FieldAccessor) -> Self {
        assert_eq!(
            accessor.prim_kind(),
            Some(primitive),
            "accessor of field `{name}` does not match its declared primitive type",
        );
        FieldDescriptor {
            name: name.to_string(),
            field_type: FieldType::Primitive(primitive),
            unshared: false,
            accessor,
        }
    }

    /// A nullable reference field dispatched through the typed value
    /// writer/reader.
    pub fn reference(name: &str, ref_type: RefType, accessor: FieldAccessor) -> Self {
        assert!(
            accessor.prim_kind().is_none(),
            "field `{name}` declares a reference type but binds a primitive accessor",
        );
        FieldDescriptor {
            name: name.to_string(),
            field_type: FieldType::Reference(ref_type),
            unshared: false,
            accessor,
        }
    }

    /// Marks the field unshared: its value is always written inline and is
    /// never looked up in or recorded into the identity table.
    ///
    /// A cycle reachable only through unshared fields cannot terminate,
    /// exactly as in the serialization contract this format descends from.
    pub fn unshared(mut self) -> Self {
        self.unshared = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_unshared(&self) -> bool {
        self.unshared
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.field_type, FieldType::Primitive(_))
    }

    pub(crate) fn ref_type(&self) -> Option<&RefType> {
        match &self.field_type {
            FieldType::Reference(rt) => Some(rt),
            FieldType::Primitive(_) => None,
        }
    }

    pub(crate) fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }
}
