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

//! Per-call marshalling state. One context per top-level call, never shared
//! across calls or threads, discarded wholesale when the call ends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::descriptor::class::ClassDescriptor;
use crate::error::UnmarshalError;
use crate::types::RefFlag;
use crate::value::Value;

/// Tracks already-written shared objects by pointer address so a repeated
/// occurrence becomes a back-reference token instead of a second encoding.
#[derive(Default)]
pub struct RefWriter {
    refs: HashMap<usize, u32>,
    next_ref_id: u32,
}

impl RefWriter {
    /// Writes the reference prefix for a shared-capable value.
    ///
    /// Returns `true` if a back-reference was written (the value is already
    /// encoded); otherwise registers the address, writes the first-occurrence
    /// flag and returns `false` so the caller encodes the content. The
    /// registration happens before any content is visited, which is what
    /// keeps cyclic graphs finite.
    pub fn try_write_ref(&mut self, writer: &mut Writer, ptr: usize) -> bool {
        if let Some(&ref_id) = self.refs.get(&ptr) {
            writer.write_i8(RefFlag::Ref as i8);
            writer.write_varuint32(ref_id);
            true
        } else {
            let ref_id = self.next_ref_id;
            self.next_ref_id += 1;
            self.refs.insert(ptr, ref_id);
            writer.write_i8(RefFlag::RefValue as i8);
            false
        }
    }
}

/// Decode-side mirror: objects are stored as soon as they are instantiated,
/// before their content is filled, so a back-reference can resolve to an
/// object still under construction.
#[derive(Default)]
pub struct RefReader {
    refs: Vec<Value>,
}

impl RefReader {
    pub fn store(&mut self, value: Value) -> u32 {
        let ref_id = self.refs.len() as u32;
        self.refs.push(value);
        ref_id
    }

    pub fn get(&self, ref_id: u32) -> Option<Value> {
        self.refs.get(ref_id as usize).cloned()
    }
}

pub struct WriteContext<'w> {
    pub writer: &'w mut Writer,
    pub ref_writer: RefWriter,
    used: Vec<Arc<ClassDescriptor>>,
    used_ids: HashSet<u32>,
}

impl<'w> WriteContext<'w> {
    pub fn new(writer: &'w mut Writer) -> WriteContext<'w> {
        WriteContext {
            writer,
            ref_writer: RefWriter::default(),
            used: Vec::new(),
            used_ids: HashSet::new(),
        }
    }

    /// Records a descriptor the encoding touched; first use wins the order.
    pub fn add_used_descriptor(&mut self, descriptor: &Arc<ClassDescriptor>) {
        if self.used_ids.insert(descriptor.class_id()) {
            self.used.push(descriptor.clone());
        }
    }

    pub fn into_used_descriptors(self) -> Vec<Arc<ClassDescriptor>> {
        self.used
    }
}

pub struct ReadContext<'r> {
    pub reader: Reader<'r>,
    pub ref_reader: RefReader,
    max_depth: u32,
    depth: u32,
}

impl<'r> ReadContext<'r> {
    pub fn new(reader: Reader<'r>, max_depth: u32) -> ReadContext<'r> {
        ReadContext {
            reader,
            ref_reader: RefReader::default(),
            max_depth,
            depth: 0,
        }
    }

    pub fn inc_depth(&mut self) -> Result<(), UnmarshalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(UnmarshalError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    pub fn dec_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
