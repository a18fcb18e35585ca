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

use std::borrow::Cow;

use thiserror::Error;

/// Failure while encoding an object graph.
///
/// Fatal for the enclosing `marshal` call; there is no partial-result
/// recovery and nothing is retried inside the core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MarshalError {
    /// A value of an unregistered concrete type reached the dispatcher.
    #[error("type `{0}` has no class descriptor in the registry")]
    UnregisteredClass(Cow<'static, str>),

    /// The declared field type and the runtime value disagree.
    #[error("value of kind `{found}` cannot be written where `{expected}` is declared")]
    TypeMismatch {
        expected: Cow<'static, str>,
        found: Cow<'static, str>,
    },

    /// A singleton list handle held other than exactly one element.
    #[error("singleton list must hold exactly one element, found {0}")]
    BadSingletonList(usize),

    /// A custom write hook failed; carries the class layer it belongs to.
    #[error("write hook of class `{class}` failed")]
    WriteHook {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    /// An internal invariant was violated.
    #[error("{0}")]
    Internal(Cow<'static, str>),
}

impl MarshalError {
    #[cold]
    pub fn internal<S: Into<Cow<'static, str>>>(s: S) -> Self {
        MarshalError::Internal(s.into())
    }
}

/// Failure while decoding an object graph.
///
/// Fatal for the enclosing `unmarshal` call; the partially built graph must
/// be discarded by the caller.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UnmarshalError {
    /// The input ended before a read completed.
    #[error("unexpected end of input: need {need} more byte(s), {remaining} left")]
    Truncated { need: usize, remaining: usize },

    /// The reference-flag byte is not one of the defined values.
    #[error("invalid reference flag {0}")]
    BadRefFlag(i8),

    /// The value tag is neither a built-in tag nor a class id.
    #[error("invalid value tag {0}")]
    BadValueTag(u32),

    /// A class id on the wire has no descriptor in the registry.
    #[error("no class descriptor registered for id {0}")]
    UnknownClassId(u32),

    /// A back-reference token points past every object read so far.
    #[error("back-reference {0} does not match any object read so far")]
    BadBackRef(u32),

    /// A length prefix exceeds the remaining input; rejected before any
    /// allocation is attempted.
    #[error("length {length} exceeds the {remaining} byte(s) left in the input")]
    LengthOutOfBounds { length: usize, remaining: usize },

    /// No instantiation strategy produced a blank instance.
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    /// A custom read hook failed; carries the class layer it belongs to.
    #[error("read hook of class `{class}` failed")]
    ReadHook {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    /// The nesting depth limit was exceeded while decoding.
    #[error("nesting depth limit of {0} exceeded while decoding")]
    DepthExceeded(u32),

    /// Malformed or self-contradictory payload bytes.
    #[error("{0}")]
    InvalidData(Cow<'static, str>),
}

impl UnmarshalError {
    #[cold]
    pub fn invalid_data<S: Into<Cow<'static, str>>>(s: S) -> Self {
        UnmarshalError::InvalidData(s.into())
    }
}

/// No configured strategy could produce a blank instance of a class.
#[derive(Error, Debug)]
#[error("cannot instantiate class `{class}`: no strategy succeeded")]
pub struct InstantiationError {
    pub class: String,
}

/// Ensures a condition holds; otherwise returns the given error.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
