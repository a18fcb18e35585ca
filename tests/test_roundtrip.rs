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

//! Round trips for the supported class shapes.

use graphwire::{
    ClassDescriptorBuilder, DescriptorRegistry, FieldAccessor, FieldDescriptor, Marshaller,
    PrimitiveType, RefType, Value,
};
use std::sync::Arc;

const POINT_ID: u32 = 64;
const TRIPLE_ID: u32 = 65;
const ANIMAL_ID: u32 = 66;
const DOG_ID: u32 = 67;

#[derive(Default)]
struct Point {
    x: i32,
    y: i32,
    label: char,
    weight: f64,
    active: bool,
}

#[derive(Default)]
struct Triple {
    a: Value,
    b: Value,
    c: Value,
}

#[derive(Default)]
struct Animal {
    legs: i32,
    name: Value,
}

#[derive(Default)]
struct Dog {
    legs: i32,
    name: Value,
    breed: Value,
}

fn marshaller() -> Marshaller {
    let mut registry = DescriptorRegistry::new();
    registry.register(
        ClassDescriptorBuilder::<Point>::new("Point", POINT_ID)
            .field(FieldDescriptor::primitive(
                "x",
                PrimitiveType::I32,
                FieldAccessor::of_i32::<Point>(|p| p.x, |p, v| p.x = v),
            ))
            .field(FieldDescriptor::primitive(
                "y",
                PrimitiveType::I32,
                FieldAccessor::of_i32::<Point>(|p| p.y, |p, v| p.y = v),
            ))
            .field(FieldDescriptor::primitive(
                "label",
                PrimitiveType::Char,
                FieldAccessor::of_char::<Point>(|p| p.label, |p, v| p.label = v),
            ))
            .field(FieldDescriptor::primitive(
                "weight",
                PrimitiveType::F64,
                FieldAccessor::of_f64::<Point>(|p| p.weight, |p, v| p.weight = v),
            ))
            .field(FieldDescriptor::primitive(
                "active",
                PrimitiveType::Bool,
                FieldAccessor::of_bool::<Point>(|p| p.active, |p, v| p.active = v),
            ))
            .build(),
    );
    registry.register(
        ClassDescriptorBuilder::<Triple>::new("Triple", TRIPLE_ID)
            .field(FieldDescriptor::reference(
                "a",
                RefType::Boxed(PrimitiveType::I32),
                FieldAccessor::of_ref::<Triple>(|t| t.a.clone(), |t, v| t.a = v),
            ))
            .field(FieldDescriptor::reference(
                "b",
                RefType::Boxed(PrimitiveType::I32),
                FieldAccessor::of_ref::<Triple>(|t| t.b.clone(), |t, v| t.b = v),
            ))
            .field(FieldDescriptor::reference(
                "c",
                RefType::Boxed(PrimitiveType::I32),
                FieldAccessor::of_ref::<Triple>(|t| t.c.clone(), |t, v| t.c = v),
            ))
            .build(),
    );
    registry.register(
        ClassDescriptorBuilder::<Animal>::new("Animal", ANIMAL_ID)
            .field(FieldDescriptor::primitive(
                "legs",
                PrimitiveType::I32,
                FieldAccessor::of_i32::<Animal>(|a| a.legs, |a, v| a.legs = v),
            ))
            .field(FieldDescriptor::reference(
                "name",
                RefType::Str,
                FieldAccessor::of_ref::<Animal>(|a| a.name.clone(), |a, v| a.name = v),
            ))
            .build(),
    );
    let dog_animal_layer = ClassDescriptorBuilder::<Dog>::new("Animal", ANIMAL_ID)
        .field(FieldDescriptor::primitive(
            "legs",
            PrimitiveType::I32,
            FieldAccessor::of_i32::<Dog>(|d| d.legs, |d, v| d.legs = v),
        ))
        .field(FieldDescriptor::reference(
            "name",
            RefType::Str,
            FieldAccessor::of_ref::<Dog>(|d| d.name.clone(), |d, v| d.name = v),
        ))
        .build();
    registry.register(
        ClassDescriptorBuilder::<Dog>::new("Dog", DOG_ID)
            .parent(dog_animal_layer)
            .field(FieldDescriptor::reference(
                "breed",
                RefType::Str,
                FieldAccessor::of_ref::<Dog>(|d| d.breed.clone(), |d, v| d.breed = v),
            ))
            .build(),
    );
    Marshaller::new(Arc::new(registry))
}

#[test]
fn all_primitive_fields_round_trip() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Point {
            x: 7,
            y: -3,
            label: 'π',
            weight: 2.5,
            active: true,
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let point = decoded.as_class::<Point>().unwrap();
    let point = point.borrow();
    assert_eq!(point.x, 7);
    assert_eq!(point.y, -3);
    assert_eq!(point.label, 'π');
    assert_eq!(point.weight, 2.5);
    assert!(point.active);
}

#[test]
fn nulls_bitmap_elides_null_payloads() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Triple {
            a: Value::Null,
            b: Value::I32(5),
            c: Value::Null,
        }))
        .unwrap();
    // ref-value flag + class tag + 3-bit bitmap (one byte, 0b101) + one i32
    assert_eq!(marshalled.bytes.len(), 7);
    assert_eq!(marshalled.bytes[2], 0b101);

    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let triple = decoded.as_class::<Triple>().unwrap();
    let triple = triple.borrow();
    assert!(triple.a.is_null());
    assert_eq!(triple.b.as_i32(), Some(5));
    assert!(triple.c.is_null());
}

#[test]
fn hierarchy_round_trips_layer_by_layer() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Dog {
            legs: 4,
            name: Value::str("rex"),
            breed: Value::str("collie"),
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let dog = decoded.as_class::<Dog>().unwrap();
    let dog = dog.borrow();
    assert_eq!(dog.legs, 4);
    assert_eq!(dog.name.as_str().unwrap().as_str(), "rex");
    assert_eq!(dog.breed.as_str().unwrap().as_str(), "collie");
}

#[test]
fn base_class_still_marshals_standalone() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Animal {
            legs: 2,
            name: Value::str("crow"),
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let animal = decoded.as_class::<Animal>().unwrap();
    assert_eq!(animal.borrow().legs, 2);
    assert_eq!(animal.borrow().name.as_str().unwrap().as_str(), "crow");
}

#[test]
fn hierarchy_with_null_fields_in_both_layers() {
    let m = marshaller();
    let marshalled = m
        .marshal(&Value::object(Dog {
            legs: 4,
            name: Value::Null,
            breed: Value::Null,
        }))
        .unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    let dog = decoded.as_class::<Dog>().unwrap();
    assert!(dog.borrow().name.is_null());
    assert!(dog.borrow().breed.is_null());
}

#[test]
fn top_level_primitives_round_trip() {
    let m = marshaller();
    for value in [
        Value::Bool(true),
        Value::I8(-8),
        Value::I16(300),
        Value::I32(-70_000),
        Value::I64(1 << 40),
        Value::F32(0.5),
        Value::F64(-1.25),
        Value::Char('ß'),
    ] {
        let marshalled = m.marshal(&value).unwrap();
        let decoded = m.unmarshal(&marshalled.bytes).unwrap();
        assert_eq!(format!("{value:?}"), format!("{decoded:?}"));
    }
}

#[test]
fn top_level_string_round_trips() {
    let m = marshaller();
    let marshalled = m.marshal(&Value::str("héllo wire")).unwrap();
    let decoded = m.unmarshal(&marshalled.bytes).unwrap();
    assert_eq!(decoded.as_str().unwrap().as_str(), "héllo wire");
}

#[test]
fn top_level_null_round_trips() {
    let m = marshaller();
    let marshalled = m.marshal(&Value::Null).unwrap();
    assert_eq!(marshalled.bytes.len(), 1);
    assert!(m.unmarshal(&marshalled.bytes).unwrap().is_null());
}
