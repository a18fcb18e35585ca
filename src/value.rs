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

//! The dynamic value the marshalling engine operates on.
//!
//! Structured objects are ordinary Rust structs erased behind
//! `Rc<dyn Any>` (the payload is a `RefCell<T>` so fields can be filled
//! after the blank instance has been registered for back-references).
//! Containers and strings are `Rc`-backed as well; `Rc` pointer identity is
//! what the identity tables key on, which is how shared and cyclic graphs
//! survive a round trip.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::types::{ListKind, MapKind, RefType, SetKind};

/// A type-erased structured object instance. The concrete payload is
/// `RefCell<T>` for the class's target type `T`.
pub type ObjHandle = Rc<dyn Any>;

/// An array with a single declared component type.
pub struct ArrayValue {
    pub component: RefType,
    pub elems: Vec<Value>,
}

pub struct ListValue {
    pub kind: ListKind,
    pub elems: Vec<Value>,
}

/// Elements are kept in insertion order; set semantics (deduplication,
/// membership) belong to the application, not the wire format.
pub struct SetValue {
    pub kind: SetKind,
    pub elems: Vec<Value>,
}

pub struct MapValue {
    pub kind: MapKind,
    pub entries: Vec<(Value, Value)>,
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(Rc<String>),
    Object(ObjHandle),
    Array(Rc<RefCell<ArrayValue>>),
    List(Rc<RefCell<ListValue>>),
    Set(Rc<RefCell<SetValue>>),
    Map(Rc<RefCell<MapValue>>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

macro_rules! prim_getters {
    ($(($fn_name:ident, $variant:ident, $ty:ty)),* $(,)?) => {
        $(
            pub fn $fn_name(&self) -> Option<$ty> {
                match self {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        )*
    };
}

impl Value {
    /// Wraps a struct instance into an object value, erasing its type.
    pub fn object<T: 'static>(instance: T) -> Value {
        Value::Object(Rc::new(RefCell::new(instance)))
    }

    /// Wraps an already shared instance; the same `Rc` used twice in one
    /// graph round-trips as one shared object.
    pub fn shared<T: 'static>(instance: &Rc<RefCell<T>>) -> Value {
        let handle: ObjHandle = instance.clone();
        Value::Object(handle)
    }

    pub fn str<S: Into<String>>(s: S) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    pub fn array(component: RefType, elems: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(ArrayValue { component, elems })))
    }

    pub fn list(kind: ListKind, elems: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(ListValue { kind, elems })))
    }

    pub fn set(kind: SetKind, elems: Vec<Value>) -> Value {
        Value::Set(Rc::new(RefCell::new(SetValue { kind, elems })))
    }

    pub fn map(kind: MapKind, entries: Vec<(Value, Value)>) -> Value {
        Value::Map(Rc::new(RefCell::new(MapValue { kind, entries })))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    prim_getters!(
        (as_bool, Bool, bool),
        (as_i8, I8, i8),
        (as_i16, I16, i16),
        (as_i32, I32, i32),
        (as_i64, I64, i64),
        (as_f32, F32, f32),
        (as_f64, F64, f64),
        (as_char, Char, char),
    );

    pub fn as_str(&self) -> Option<Rc<String>> {
        match self {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Recovers the concrete instance of a registered class.
    pub fn as_class<T: 'static>(&self) -> Option<Rc<RefCell<T>>> {
        match self {
            Value::Object(handle) => handle.clone().downcast::<RefCell<T>>().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Rc<RefCell<ArrayValue>>> {
        match self {
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<Rc<RefCell<ListValue>>> {
        match self {
            Value::List(l) => Some(l.clone()),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<Rc<RefCell<SetValue>>> {
        match self {
            Value::Set(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<Rc<RefCell<MapValue>>> {
        match self {
            Value::Map(m) => Some(m.clone()),
            _ => None,
        }
    }

    /// Address the identity tables key on; `None` for values that are
    /// always written inline.
    pub(crate) fn identity_ptr(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(Rc::as_ptr(s) as usize),
            Value::Object(h) => Some(Rc::as_ptr(h) as *const () as usize),
            Value::Array(a) => Some(Rc::as_ptr(a) as usize),
            Value::List(l) => Some(Rc::as_ptr(l) as usize),
            Value::Set(s) => Some(Rc::as_ptr(s) as usize),
            Value::Map(m) => Some(Rc::as_ptr(m) as usize),
            _ => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }
}

macro_rules! prim_from {
    ($(($variant:ident, $ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Value {
                    Value::$variant(v)
                }
            }
        )*
    };
}

prim_from!(
    (Bool, bool),
    (I8, i8),
    (I16, i16),
    (I32, i32),
    (I64, i64),
    (F32, f32),
    (F64, f64),
    (Char, char),
);

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::str(s)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I8(v) => write!(f, "I8({v})"),
            Value::I16(v) => write!(f, "I16({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Char(v) => write!(f, "Char({v:?})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Object(h) => write!(f, "Object(@{:p})", Rc::as_ptr(h)),
            Value::Array(_) => write!(f, "Array(..)"),
            Value::List(l) => write!(f, "List({:?}, ..)", l.borrow().kind),
            Value::Set(s) => write!(f, "Set({:?}, ..)", s.borrow().kind),
            Value::Map(m) => write!(f, "Map({:?}, ..)", m.borrow().kind),
        }
    }
}
