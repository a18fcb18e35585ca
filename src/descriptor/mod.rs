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

//! Class and field metadata for the user object serialization.
//!
//! Descriptors are built once — normally from the platform's descriptor
//! registry exchange, in tests by hand — and are immutable, shareable input
//! to the marshalling engine. Two peers must construct identical field order
//! and null-bitmap layout for the same class id; this is assumed, not
//! re-verified, at marshal time.

pub mod class;
pub mod field;
pub mod registry;
