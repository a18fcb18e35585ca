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

//! Rejection of corrupt, truncated and hostile input. Every case must fail
//! with a terminal error — never a panic, never an oversized allocation.

use graphwire::{
    ClassDescriptorBuilder, DescriptorRegistry, FieldAccessor, FieldDescriptor, ListKind,
    Marshaller, PrimitiveType, UnmarshalError, Value,
};
use std::sync::Arc;

const FLAG_ID: u32 = 64;

#[derive(Default)]
struct Flag {
    on: bool,
}

fn marshaller() -> Marshaller {
    let mut registry = DescriptorRegistry::new();
    registry.register(
        ClassDescriptorBuilder::<Flag>::new("Flag", FLAG_ID)
            .field(FieldDescriptor::primitive(
                "on",
                PrimitiveType::Bool,
                FieldAccessor::of_bool::<Flag>(|f| f.on, |f, v| f.on = v),
            ))
            .build(),
    );
    Marshaller::new(Arc::new(registry))
}

// wire constants, mirroring the encoder
const REF_VALUE: u8 = 0x00;
const NOT_NULL: u8 = 0xFF;
const REF: u8 = 0xFE;
const TAG_CHAR: u8 = 8;
const TAG_VEC_LIST: u8 = 11;

#[test]
fn empty_input_is_rejected() {
    let m = marshaller();
    assert!(matches!(
        m.unmarshal(&[]),
        Err(UnmarshalError::Truncated { .. })
    ));
}

#[test]
fn oversized_length_is_rejected_before_allocation() {
    let m = marshaller();
    // a list claiming 100 elements with zero bytes of content behind it
    let bytes = [REF_VALUE, TAG_VEC_LIST, 100];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::LengthOutOfBounds {
            length: 100,
            remaining: 0
        })
    ));
}

#[test]
fn huge_varint_length_is_rejected() {
    let m = marshaller();
    // length ~ 250 million
    let bytes = [REF_VALUE, TAG_VEC_LIST, 0xFF, 0xFF, 0xFF, 0x7F];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::LengthOutOfBounds { .. })
    ));
}

#[test]
fn invalid_reference_flag_is_rejected() {
    let m = marshaller();
    assert!(matches!(
        m.unmarshal(&[0x55]),
        Err(UnmarshalError::BadRefFlag(0x55))
    ));
}

#[test]
fn invalid_value_tag_is_rejected() {
    let m = marshaller();
    assert!(matches!(
        m.unmarshal(&[NOT_NULL, 25]),
        Err(UnmarshalError::BadValueTag(25))
    ));
}

#[test]
fn unknown_class_id_is_rejected() {
    let m = marshaller();
    let bytes = [REF_VALUE, 99];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::UnknownClassId(99))
    ));
}

#[test]
fn dangling_back_reference_is_rejected() {
    let m = marshaller();
    let bytes = [REF, 5];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::BadBackRef(5))
    ));
}

#[test]
fn truncated_payload_is_rejected() {
    let m = marshaller();
    let bytes = m.marshal(&Value::I64(77)).unwrap().bytes;
    let err = m.unmarshal(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, UnmarshalError::Truncated { .. }));
}

#[test]
fn trailing_bytes_are_rejected() {
    let m = marshaller();
    let mut bytes = m.marshal(&Value::object(Flag { on: true })).unwrap().bytes;
    bytes.push(0);
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::InvalidData(_))
    ));
}

#[test]
fn invalid_bool_byte_is_rejected() {
    let m = marshaller();
    let bytes = [REF_VALUE, FLAG_ID as u8, 7];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::InvalidData(_))
    ));
}

#[test]
fn invalid_char_scalar_is_rejected() {
    let m = marshaller();
    // 0xFFFFFFFF is not a unicode scalar value
    let bytes = [NOT_NULL, TAG_CHAR, 0xFF, 0xFF, 0xFF, 0xFF];
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::InvalidData(_))
    ));
}

#[test]
fn invalid_utf8_string_is_rejected() {
    let m = marshaller();
    let mut bytes = m.marshal(&Value::str("ok")).unwrap().bytes;
    // corrupt the payload: "ok" sits in the last two bytes
    let len = bytes.len();
    bytes[len - 2] = 0xC3;
    bytes[len - 1] = 0x28;
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::InvalidData(_))
    ));
}

#[test]
fn nesting_depth_limit_is_enforced() {
    let m = marshaller().max_depth(4);
    let mut value = Value::I32(1);
    for _ in 0..10 {
        value = Value::list(ListKind::Vec, vec![value]);
    }
    let bytes = m.marshal(&value).unwrap().bytes;
    assert!(matches!(
        m.unmarshal(&bytes),
        Err(UnmarshalError::DepthExceeded(4))
    ));
}

#[test]
fn deep_but_allowed_nesting_still_decodes() {
    let m = marshaller();
    let mut value = Value::I32(1);
    for _ in 0..100 {
        value = Value::list(ListKind::Vec, vec![value]);
    }
    let bytes = m.marshal(&value).unwrap().bytes;
    assert!(m.unmarshal(&bytes).is_ok());
}
