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

//! Custom per-layer write/read hooks: extra data, interleaving with default
//! fields, hooks on intermediate lineage layers, nesting and failures.

use anyhow::anyhow;
use graphwire::{
    ClassDescriptorBuilder, DescriptorRegistry, FieldAccessor, FieldDescriptor, MarshalError,
    Marshaller, PrimitiveType, RefType, UnmarshalError, Value,
};
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

const BLOB_ID: u32 = 64;
const BASE_ID: u32 = 65;
const DERIVED_ID: u32 = 66;
const FAILING_ID: u32 = 67;
const ENVELOPE_ID: u32 = 68;

#[derive(Default)]
struct Blob {
    size: i32,
    payload: Value,
    // not described by the descriptor; reconstructed from hook extras
    cached_twice: i32,
}

#[derive(Default)]
struct Derived {
    base_version: i32,
    extra: Value,
    header_seen: bool,
}

#[derive(Default)]
struct Failing {
    n: i32,
}

#[derive(Default)]
struct Envelope {
    inner: Value,
}

fn blob_cell(object: &dyn Any) -> &RefCell<Blob> {
    object.downcast_ref::<RefCell<Blob>>().unwrap()
}

fn marshaller() -> Marshaller {
    let mut registry = DescriptorRegistry::new();
    registry.register(
        ClassDescriptorBuilder::<Blob>::new("Blob", BLOB_ID)
            .field(FieldDescriptor::primitive(
                "size",
                PrimitiveType::I32,
                FieldAccessor::of_i32::<Blob>(|b| b.size, |b, v| b.size = v),
            ))
            .field(FieldDescriptor::reference(
                "payload",
                RefType::Str,
                FieldAccessor::of_ref::<Blob>(|b| b.payload.clone(), |b, v| b.payload = v),
            ))
            .write_hook(|object, out| {
                out.write_default_fields()?;
                let twice = blob_cell(object).borrow().size * 2;
                out.write_i32(twice);
                Ok(())
            })
            .read_hook(|object, input| {
                input.read_default_fields()?;
                let twice = input.read_i32()?;
                blob_cell(object).borrow_mut().cached_twice = twice;
                Ok(())
            })
            .build(),
    );

    // hook sits on the ancestor layer only; the derived layer stays default
    let base_layer = ClassDescriptorBuilder::<Derived>::new("Base", BASE_ID)
        .field(FieldDescriptor::primitive(
            "base_version",
            PrimitiveType::I32,
            FieldAccessor::of_i32::<Derived>(|d| d.base_version, |d, v| d.base_version = v),
        ))
        .write_hook(|_, out| {
            out.write_str("hdr");
            out.write_default_fields()?;
            out.write_bool(true);
            Ok(())
        })
        .read_hook(|object, input| {
            let header = input.read_str()?;
            if header != "hdr" {
                return Err(anyhow!("unexpected header {header:?}"));
            }
            input.read_default_fields()?;
            let flag = input.read_bool()?;
            object
                .downcast_ref::<RefCell<Derived>>()
                .unwrap()
                .borrow_mut()
                .header_seen = flag;
            Ok(())
        })
        .build();
    registry.register(
        ClassDescriptorBuilder::<Derived>::new("Derived", DERIVED_ID)
            .parent(base_layer)
            .field(FieldDescriptor::reference(
                "extra",
                RefType::Str,
                FieldAccessor::of_ref::<Derived>(|d| d.extra.clone(), |d, v| d.extra = v),
            ))
            .build(),
    );

    registry.register(
        ClassDescriptorBuilder::<Failing>::new("Failing", FAILING_ID)
            .field(FieldDescriptor::primitive(
                "n",
                PrimitiveType::I32,
                FieldAccessor::of_i32::<Failing>(|f| f.n, |f, v| f.n = v),
            ))
            .write_hook(|_, _| Err(anyhow!("refusing to encode")))
            .read_hook(|_, _| Err(anyhow!("refusing to decode")))
            .build(),
    );

    // hook marshals a nested value, which may itself run hooks
    registry.register(
        ClassDescriptorBuilder::<Envelope>::new("Envelope", ENVELOPE_ID)
            .write_hook(|object, out| {
                let inner = object
                    .downcast_ref::<RefCell<Envelope>>()
                    .unwrap()
                    .borrow()
                    .inner
                    .clone();
                out.write_value(&inner)?;
                Ok(())
            })
            .read_hook(|object, input| {
                let inner = input.read_value()?;
                object
                    .downcast_ref::<RefCell<Envelope>>()
                    .unwrap()
                    .borrow_mut()
                    .inner = inner;
                Ok(())
            })
            .build(),
    );

    Marshaller::new(Arc::new(registry))
}

#[test]
fn hook_extras_follow_default_fields() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Blob {
            size: 21,
            payload: Value::str("data"),
            cached_twice: 0,
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let blob = decoded.as_class::<Blob>().unwrap();
    let blob = blob.borrow();
    assert_eq!(blob.size, 21);
    assert_eq!(blob.payload.as_str().unwrap().as_str(), "data");
    assert_eq!(blob.cached_twice, 42);
}

#[test]
fn hook_on_intermediate_layer_only() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Derived {
            base_version: 3,
            extra: Value::str("tail"),
            header_seen: false,
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let derived = decoded.as_class::<Derived>().unwrap();
    let derived = derived.borrow();
    assert_eq!(derived.base_version, 3);
    assert_eq!(derived.extra.as_str().unwrap().as_str(), "tail");
    assert!(derived.header_seen);
}

#[test]
fn nested_value_marshalled_from_inside_a_hook() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Envelope {
            inner: Value::object(Blob {
                size: 5,
                payload: Value::Null,
                cached_twice: 0,
            }),
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let envelope = decoded.as_class::<Envelope>().unwrap();
    let inner = envelope.borrow().inner.as_class::<Blob>().unwrap();
    assert_eq!(inner.borrow().size, 5);
    assert_eq!(inner.borrow().cached_twice, 10);
    assert!(inner.borrow().payload.is_null());
}

#[test]
fn envelope_can_carry_a_back_reference_to_itself() {
    let m = marshaller();
    let envelope = std::rc::Rc::new(RefCell::new(Envelope { inner: Value::Null }));
    envelope.borrow_mut().inner = Value::shared(&envelope);

    let marshalled = m.marshal(&Value::shared(&envelope)).unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();

    let e2 = decoded.as_class::<Envelope>().unwrap();
    let e3 = e2.borrow().inner.as_class::<Envelope>().unwrap();
    assert!(std::rc::Rc::ptr_eq(&e2, &e3));
}

#[test]
fn write_hook_failure_names_the_class_layer() {
    let m = marshaller();
    let err = m
        .marshal(&Value::object(Failing { n: 1 }))
        .unwrap_err();
    match err {
        MarshalError::WriteHook { class, .. } => assert_eq!(class, "Failing"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn read_hook_failure_names_the_class_layer() {
    let m = marshaller();
    // craft the bytes by hand; the write hook refuses to produce them
    let bytes = vec![0x00, FAILING_ID as u8];
    let err = m.unmarshal(&bytes).unwrap_err();
    match err {
        UnmarshalError::ReadHook { class, .. } => assert_eq!(class, "Failing"),
        other => panic!("unexpected error {other:?}"),
    }
}
