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

//! Blank-instance creation, used on decode before fields are filled.
//!
//! Strategies are tried in priority order: first the cooperative path that
//! honors a class's own blank-copy contract, then zero-state construction
//! that bypasses any class-specific logic. The list is configurable on the
//! [`Marshaller`](crate::Marshaller), so embedders can insert their own
//! allocation scheme without touching the engine.

use crate::descriptor::class::ClassDescriptor;
use crate::error::InstantiationError;
use crate::value::ObjHandle;

pub trait InstantiationStrategy: Send + Sync {
    /// Whether this strategy can even attempt the given class.
    fn supports(&self, descriptor: &ClassDescriptor) -> bool;

    /// Produces a blank instance. A failure is not fatal by itself; the
    /// best-effort chain moves on to the next strategy.
    fn instantiate(&self, descriptor: &ClassDescriptor) -> Result<ObjHandle, InstantiationError>;
}

/// Cooperative path: the class supplied its own blank-copy factory.
pub struct BlankFactoryInstantiation;

impl InstantiationStrategy for BlankFactoryInstantiation {
    fn supports(&self, descriptor: &ClassDescriptor) -> bool {
        descriptor.has_blank_factory()
    }

    fn instantiate(&self, descriptor: &ClassDescriptor) -> Result<ObjHandle, InstantiationError> {
        descriptor.blank_instance().ok_or_else(|| InstantiationError {
            class: descriptor.name().to_string(),
        })
    }
}

/// Fallback path: zero-state construction captured at descriptor build time,
/// running none of the class's own construction logic.
pub struct DefaultInstantiation;

impl InstantiationStrategy for DefaultInstantiation {
    fn supports(&self, _descriptor: &ClassDescriptor) -> bool {
        true
    }

    fn instantiate(&self, descriptor: &ClassDescriptor) -> Result<ObjHandle, InstantiationError> {
        Ok(descriptor.default_instance())
    }
}

/// Tries an ordered list of strategies and fails only when every one of
/// them declined or failed.
pub struct BestEffortInstantiation {
    strategies: Vec<Box<dyn InstantiationStrategy>>,
}

impl BestEffortInstantiation {
    /// Blank-factory first, zero-state construction as the fallback.
    pub fn standard() -> Self {
        Self::with_strategies(vec![
            Box::new(BlankFactoryInstantiation),
            Box::new(DefaultInstantiation),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn InstantiationStrategy>>) -> Self {
        BestEffortInstantiation { strategies }
    }

    pub fn instantiate(
        &self,
        descriptor: &ClassDescriptor,
    ) -> Result<ObjHandle, InstantiationError> {
        for strategy in &self.strategies {
            if !strategy.supports(descriptor) {
                continue;
            }
            if let Ok(instance) = strategy.instantiate(descriptor) {
                return Ok(instance);
            }
        }
        Err(InstantiationError {
            class: descriptor.name().to_string(),
        })
    }
}

impl Default for BestEffortInstantiation {
    fn default() -> Self {
        Self::standard()
    }
}
