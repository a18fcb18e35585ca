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

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::descriptor::class::ClassDescriptor;

/// Id-indexed and type-indexed descriptor lookup.
///
/// How descriptor ids are discovered, assigned and agreed upon across nodes
/// is the registry exchange protocol's concern; by the time marshalling
/// happens, both peers hold an equivalent registry. Only most-derived
/// descriptors are registered here — ancestor layers live inside their
/// descendants' lineage and share ids with the standalone descriptors of
/// their own classes.
#[derive(Default)]
pub struct DescriptorRegistry {
    by_id: HashMap<u32, Arc<ClassDescriptor>>,
    by_instance_type: HashMap<TypeId, Arc<ClassDescriptor>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its class id and concrete type.
    ///
    /// Panics on a duplicate id or type; the registry is configuration and
    /// a clash means two classes were wired to the same identity.
    pub fn register(&mut self, descriptor: Arc<ClassDescriptor>) {
        let id = descriptor.class_id();
        let previous = self.by_id.insert(id, descriptor.clone());
        assert!(
            previous.is_none(),
            "class id {id} registered twice (`{}`)",
            descriptor.name(),
        );
        let previous = self
            .by_instance_type
            .insert(descriptor.instance_type(), descriptor.clone());
        assert!(
            previous.is_none(),
            "concrete type of `{}` registered twice",
            descriptor.name(),
        );
        debug!("registered class descriptor `{}` (id {id})", descriptor.name());
    }

    pub fn by_class_id(&self, class_id: u32) -> Option<&Arc<ClassDescriptor>> {
        self.by_id.get(&class_id)
    }

    pub(crate) fn by_instance_type(&self, instance_type: TypeId) -> Option<&Arc<ClassDescriptor>> {
        self.by_instance_type.get(&instance_type)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
