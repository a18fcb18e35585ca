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

//! The marshalling engine.
//!
//! `Marshaller` is stateless apart from its configuration and may be shared
//! across threads; every top-level call builds its own context, which is
//! discarded when the call returns. Recursion is plain call nesting bounded
//! by the object graph's depth — there is no background work, cancellation
//! or timeout inside the engine.

pub mod containers;
pub mod context;
pub mod dispatch;
pub mod hooks;
pub mod protocol;
pub mod structured;

use std::sync::Arc;

use log::trace;

use crate::buffer::{Reader, Writer};
use crate::descriptor::class::ClassDescriptor;
use crate::descriptor::registry::DescriptorRegistry;
use crate::ensure;
use crate::error::{MarshalError, UnmarshalError};
use crate::instantiate::BestEffortInstantiation;
use crate::marshal::context::{ReadContext, WriteContext};
use crate::value::Value;

const DEFAULT_MAX_DEPTH: u32 = 1024;

/// Result of a `marshal` call: the payload bytes plus every class descriptor
/// the encoding touched, in first-use order (ancestors before descendants
/// within a lineage). The embedding transport ships the used set so the
/// receiver knows exactly which class versions participated, without a
/// separate handshake.
pub struct Marshalled {
    pub bytes: Vec<u8>,
    pub used_descriptors: Vec<Arc<ClassDescriptor>>,
}

impl std::fmt::Debug for Marshalled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<u32> = self.used_descriptors.iter().map(|d| d.class_id()).collect();
        f.debug_struct("Marshalled")
            .field("bytes", &self.bytes.len())
            .field("used_descriptors", &ids)
            .finish()
    }
}

pub struct Marshaller {
    pub(crate) registry: Arc<DescriptorRegistry>,
    pub(crate) instantiation: BestEffortInstantiation,
    max_depth: u32,
}

impl Marshaller {
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Marshaller {
            registry,
            instantiation: BestEffortInstantiation::standard(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replaces the instantiation strategy chain used on decode.
    pub fn instantiation(mut self, instantiation: BestEffortInstantiation) -> Self {
        self.instantiation = instantiation;
        self
    }

    /// Sets the decode-side nesting depth limit.
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn marshal(&self, value: &Value) -> Result<Marshalled, MarshalError> {
        let mut writer = Writer::default();
        let mut ctx = WriteContext::new(&mut writer);
        self.write_value(value, None, false, &mut ctx)?;
        let used_descriptors = ctx.into_used_descriptors();
        let bytes = writer.into_vec();
        trace!(
            "marshalled {} byte(s), {} descriptor(s) used",
            bytes.len(),
            used_descriptors.len()
        );
        Ok(Marshalled {
            bytes,
            used_descriptors,
        })
    }

    pub fn unmarshal(&self, bytes: &[u8]) -> Result<Value, UnmarshalError> {
        let reader = Reader::new(bytes);
        let mut ctx = ReadContext::new(reader, self.max_depth);
        let value = self.read_value(None, false, &mut ctx)?;
        ensure!(
            ctx.reader.remaining() == 0,
            UnmarshalError::invalid_data(format!(
                "{} trailing byte(s) after the top-level value",
                ctx.reader.remaining()
            ))
        );
        Ok(value)
    }
}
