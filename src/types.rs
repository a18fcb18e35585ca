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

//! Wire-level flags and tags, and the declared-type model that field and
//! component declarations are expressed in.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Per-value prefix byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(i8)]
pub enum RefFlag {
    Null = -3,
    // Ref is followed by a varuint token of a previously registered object.
    Ref = -2,
    // NotNullValue marks a value written inline, outside the identity table.
    NotNullValue = -1,
    // RefValue marks a value registered in the identity table and first seen.
    RefValue = 0,
}

/// Built-in value tags. Class descriptor ids start at [`FIRST_CLASS_ID`];
/// everything below is reserved for this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum ValueTag {
    BOOL = 1,
    INT8 = 2,
    INT16 = 3,
    INT32 = 4,
    INT64 = 5,
    FLOAT32 = 6,
    FLOAT64 = 7,
    CHAR = 8,
    STRING = 9,
    ARRAY = 10,
    VEC_LIST = 11,
    LINKED_LIST = 12,
    HASH_SET = 13,
    LINKED_HASH_SET = 14,
    HASH_MAP = 15,
    LINKED_HASH_MAP = 16,
    SINGLETON_LIST = 17,
    DYNAMIC = 18,
}

/// Lowest descriptor id a registry may assign to a class.
pub const FIRST_CLASS_ID: u32 = 64;

/// Primitive kinds with fixed-width direct encoding and fast field accessors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
}

impl PrimitiveType {
    pub fn tag(self) -> ValueTag {
        match self {
            PrimitiveType::Bool => ValueTag::BOOL,
            PrimitiveType::I8 => ValueTag::INT8,
            PrimitiveType::I16 => ValueTag::INT16,
            PrimitiveType::I32 => ValueTag::INT32,
            PrimitiveType::I64 => ValueTag::INT64,
            PrimitiveType::F32 => ValueTag::FLOAT32,
            PrimitiveType::F64 => ValueTag::FLOAT64,
            PrimitiveType::Char => ValueTag::CHAR,
        }
    }
}

/// Declared type of a reference-valued field or array component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefType {
    /// A nullable primitive wrapper.
    Boxed(PrimitiveType),
    Str,
    Array(Box<RefType>),
    List,
    Set,
    Map,
    /// A registered class, by descriptor id.
    Class(u32),
    /// No static knowledge; the runtime tag decides everything.
    Dyn,
}

/// Declared type of a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// Stored directly in the instance, never null, no per-value prefix.
    Primitive(PrimitiveType),
    /// Nullable, dispatched through the typed value writer/reader.
    Reference(RefType),
}

/// Built-in list kinds the container marshaller knows how to instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Vec,
    Linked,
    /// Exactly one element, encoded without a length prefix.
    Singleton,
}

impl ListKind {
    pub fn tag(self) -> ValueTag {
        match self {
            ListKind::Vec => ValueTag::VEC_LIST,
            ListKind::Linked => ValueTag::LINKED_LIST,
            ListKind::Singleton => ValueTag::SINGLETON_LIST,
        }
    }
}

/// Built-in set kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetKind {
    Hash,
    /// Preserves insertion order.
    Ordered,
}

impl SetKind {
    pub fn tag(self) -> ValueTag {
        match self {
            SetKind::Hash => ValueTag::HASH_SET,
            SetKind::Ordered => ValueTag::LINKED_HASH_SET,
        }
    }
}

/// Built-in map kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapKind {
    Hash,
    /// Preserves insertion order.
    Ordered,
}

impl MapKind {
    pub fn tag(self) -> ValueTag {
        match self {
            MapKind::Hash => ValueTag::HASH_MAP,
            MapKind::Ordered => ValueTag::LINKED_HASH_MAP,
        }
    }
}
