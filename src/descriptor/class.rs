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

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use crate::descriptor::field::FieldDescriptor;
use crate::marshal::hooks::{HookReader, HookWriter};
use crate::types::{FieldType, FIRST_CLASS_ID};
use crate::value::ObjHandle;

/// Produces a blank instance of the descriptor's target type.
pub type InstanceFactory = Box<dyn Fn() -> ObjHandle + Send + Sync>;

/// Class-specific override of the default field encoding for one lineage
/// layer. The hook receives the erased instance and a stream facade that can
/// interleave default-field emission with arbitrary extra data.
pub type WriteHookFn =
    Box<dyn Fn(&dyn Any, &mut HookWriter<'_, '_>) -> anyhow::Result<()> + Send + Sync>;

/// Decode-side counterpart of [`WriteHookFn`]; must consume exactly the
/// bytes its write hook produced, in the same order.
pub type ReadHookFn =
    Box<dyn Fn(&dyn Any, &mut HookReader<'_, '_>) -> anyhow::Result<()> + Send + Sync>;

/// Immutable per-class wire metadata: assigned id, ordered fields, lineage,
/// hook flags and the derived null-bitmap layout.
///
/// A class hierarchy is described by one descriptor per layer; every layer of
/// a lineage binds its accessors to the same concrete Rust type (the
/// most-derived one), while sharing its class id and field layout with the
/// standalone descriptor of the layer's own class. The ancestor list is
/// flattened once at build time, so no parent-pointer walking happens during
/// marshalling.
pub struct ClassDescriptor {
    class_id: u32,
    name: String,
    fields: Vec<FieldDescriptor>,
    parent: Option<Arc<ClassDescriptor>>,
    ancestors: Vec<Arc<ClassDescriptor>>,
    sealed: bool,
    write_hook: Option<WriteHookFn>,
    read_hook: Option<ReadHookFn>,
    instance_type: TypeId,
    make_blank: Option<InstanceFactory>,
    make_default: InstanceFactory,
    bitmap_slots: Vec<Option<usize>>,
    nulls_bitmap_len: usize,
}

impl ClassDescriptor {
    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn parent(&self) -> Option<&Arc<ClassDescriptor>> {
        self.parent.as_ref()
    }

    /// Ancestor layers, most ancestral first, excluding this descriptor.
    pub fn ancestors(&self) -> &[Arc<ClassDescriptor>] {
        &self.ancestors
    }

    /// Whether the runtime type of a field declared with this class is
    /// always exactly this class, letting the encoder elide the type tag.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn has_write_hook(&self) -> bool {
        self.write_hook.is_some()
    }

    pub fn has_read_hook(&self) -> bool {
        self.read_hook.is_some()
    }

    /// Number of bits in this layer's null bitmap: one per reference-typed
    /// field, in field order. Both peers derive this independently from the
    /// field list; nothing about it is negotiated on the wire.
    pub fn nulls_bitmap_len(&self) -> usize {
        self.nulls_bitmap_len
    }

    /// Bitmap slot of the field at `field_index`, if it participates.
    pub fn bitmap_slot(&self, field_index: usize) -> Option<usize> {
        self.bitmap_slots[field_index]
    }

    pub fn has_blank_factory(&self) -> bool {
        self.make_blank.is_some()
    }

    /// Blank instance through the class's declared construction contract.
    pub fn blank_instance(&self) -> Option<ObjHandle> {
        self.make_blank.as_ref().map(|f| f())
    }

    /// Blank instance through zero-state construction.
    pub fn default_instance(&self) -> ObjHandle {
        (self.make_default)()
    }

    pub(crate) fn instance_type(&self) -> TypeId {
        self.instance_type
    }

    pub(crate) fn write_hook(&self) -> Option<&WriteHookFn> {
        self.write_hook.as_ref()
    }

    pub(crate) fn read_hook(&self) -> Option<&ReadHookFn> {
        self.read_hook.as_ref()
    }
}

/// Lineage of a descriptor: ancestors first, the descriptor itself last.
pub fn lineage<'a>(
    descriptor: &'a Arc<ClassDescriptor>,
) -> impl Iterator<Item = &'a Arc<ClassDescriptor>> {
    descriptor.ancestors.iter().chain(std::iter::once(descriptor))
}

/// Builds a [`ClassDescriptor`] bound to the concrete type `T`.
pub struct ClassDescriptorBuilder<T> {
    name: String,
    class_id: u32,
    fields: Vec<FieldDescriptor>,
    parent: Option<Arc<ClassDescriptor>>,
    sealed: bool,
    write_hook: Option<WriteHookFn>,
    read_hook: Option<ReadHookFn>,
    make_blank: Option<InstanceFactory>,
    _target: PhantomData<T>,
}

impl<T: Default + 'static> ClassDescriptorBuilder<T> {
    /// Starts a descriptor for class `name` with the registry-assigned id.
    ///
    /// Panics if `class_id` collides with the built-in value tag space.
    pub fn new(name: &str, class_id: u32) -> Self {
        assert!(
            class_id >= FIRST_CLASS_ID,
            "class id {class_id} collides with built-in value tags (first usable id is {FIRST_CLASS_ID})",
        );
        ClassDescriptorBuilder {
            name: name.to_string(),
            class_id,
            fields: Vec::new(),
            parent: None,
            sealed: false,
            write_hook: None,
            read_hook: None,
            make_blank: None,
            _target: PhantomData,
        }
    }

    /// Appends a field; order is the wire order and must match on both peers.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the superclass layer. The parent must be built against the same
    /// concrete type `T`.
    pub fn parent(mut self, parent: Arc<ClassDescriptor>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares that no registered class ever subtypes this one, so a field
    /// declared with this class needs no runtime type tag.
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn write_hook(
        mut self,
        hook: impl Fn(&dyn Any, &mut HookWriter<'_, '_>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.write_hook = Some(Box::new(hook));
        self
    }

    pub fn read_hook(
        mut self,
        hook: impl Fn(&dyn Any, &mut HookReader<'_, '_>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.read_hook = Some(Box::new(hook));
        self
    }

    /// Registers the class's own blank-copy construction contract, tried
    /// before zero-state construction when decoding.
    pub fn blank_factory(mut self, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.make_blank = Some(Box::new(move || -> ObjHandle {
            Rc::new(RefCell::new(factory()))
        }));
        self
    }

    pub fn build(self) -> Arc<ClassDescriptor> {
        let instance_type = TypeId::of::<RefCell<T>>();
        if let Some(parent) = &self.parent {
            assert_eq!(
                parent.instance_type, instance_type,
                "lineage layers of `{}` must bind to one concrete type",
                self.name,
            );
        }

        let mut ancestors = Vec::new();
        if let Some(parent) = self.parent.clone() {
            ancestors.extend(parent.ancestors.iter().cloned());
            ancestors.push(parent);
        }

        let mut bitmap_slots = Vec::with_capacity(self.fields.len());
        let mut slots = 0;
        for field in &self.fields {
            bitmap_slots.push(match field.field_type() {
                FieldType::Reference(_) => {
                    let slot = slots;
                    slots += 1;
                    Some(slot)
                }
                FieldType::Primitive(_) => None,
            });
        }

        Arc::new(ClassDescriptor {
            class_id: self.class_id,
            name: self.name,
            fields: self.fields,
            parent: self.parent,
            ancestors,
            sealed: self.sealed,
            write_hook: self.write_hook,
            read_hook: self.read_hook,
            instance_type,
            make_blank: self.make_blank,
            make_default: Box::new(|| -> ObjHandle { Rc::new(RefCell::new(T::default())) }),
            bitmap_slots,
            nulls_bitmap_len: slots,
        })
    }
}
