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

//! # Graphwire
//!
//! Binary object-graph marshalling for inter-node messages and persisted
//! payloads. The format is compact and self-describing: structured objects
//! are encoded layer by layer along their class lineage, built-in containers
//! get dedicated codecs, and shared references (including cycles) are
//! preserved through back-reference tokens.
//!
//! ## Architecture
//!
//! - **`buffer`**: little-endian `Writer`/`Reader` with bounds-checked reads
//! - **`types`**: wire flags, value tags and the declared-type model
//! - **`value`**: the dynamic value that marshalling operates on
//! - **`descriptor`**: class/field metadata with capability-bound accessors
//! - **`instantiate`**: blank-instance creation strategies used on decode
//! - **`marshal`**: the engine — dispatcher, structured-object and container
//!   codecs, per-call contexts
//! - **`error`**: encode/decode error taxonomy
//!
//! Class descriptors are supplied by an external registry that both peers
//! agree on; this crate treats descriptor ids as opaque, pre-assigned
//! integers and never invents or renumbers them.
//!
//! ## Usage
//!
//! ```rust
//! use graphwire::{
//!     ClassDescriptorBuilder, DescriptorRegistry, FieldAccessor,
//!     FieldDescriptor, Marshaller, PrimitiveType, Value,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let mut registry = DescriptorRegistry::new();
//! registry.register(
//!     ClassDescriptorBuilder::<Point>::new("Point", 64)
//!         .field(FieldDescriptor::primitive(
//!             "x",
//!             PrimitiveType::I32,
//!             FieldAccessor::of_i32::<Point>(|p| p.x, |p, v| p.x = v),
//!         ))
//!         .field(FieldDescriptor::primitive(
//!             "y",
//!             PrimitiveType::I32,
//!             FieldAccessor::of_i32::<Point>(|p| p.y, |p, v| p.y = v),
//!         ))
//!         .build(),
//! );
//!
//! let marshaller = Marshaller::new(Arc::new(registry));
//! let marshalled = marshaller.marshal(&Value::object(Point { x: 1, y: 2 })).unwrap();
//! let decoded = marshaller.unmarshal(&marshalled.bytes).unwrap();
//! let point = decoded.as_class::<Point>().unwrap();
//! assert_eq!(point.borrow().x, 1);
//! ```

pub mod buffer;
pub mod descriptor;
pub mod error;
pub mod instantiate;
pub mod marshal;
pub mod types;
pub mod value;

pub use descriptor::class::{lineage, ClassDescriptor, ClassDescriptorBuilder};
pub use descriptor::field::{FieldAccessor, FieldDescriptor};
pub use descriptor::registry::DescriptorRegistry;
pub use error::{InstantiationError, MarshalError, UnmarshalError};
pub use instantiate::{
    BestEffortInstantiation, BlankFactoryInstantiation, DefaultInstantiation,
    InstantiationStrategy,
};
pub use marshal::hooks::{HookReader, HookWriter};
pub use marshal::{Marshalled, Marshaller};
pub use types::{FieldType, ListKind, MapKind, PrimitiveType, RefType, SetKind};
pub use value::{ArrayValue, ListValue, MapValue, ObjHandle, SetValue, Value};
