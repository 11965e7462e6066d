/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Worker invocation and output handling.
//!
//! A worker is an external, single-shot analysis program. This module
//! contains the adapter that spawns it ([`invoker`]) and the parser that
//! turns its stdout into a validated result document ([`output`]).

pub mod invoker;
pub mod output;

pub use invoker::{
    FailureKind, InvocationLimits, InvocationOutcome, ProcessWorkerInvoker, WorkerInvoker,
};
pub use output::{parse_worker_output, OutputParseError, ResultDocument};
