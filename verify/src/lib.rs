// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Drive a verification backend over a set of properties.
//!
//! The [`processor`] checks properties one at a time, prunes the remaining
//! work with the traces it gets back ([`reduce`]), removes redundant traces at
//! the end of the run ([`dedup`]) and optionally maps traces recorded on a
//! transformed component back onto the original one ([`annotate`]).

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod annotate;
pub mod conf;
pub mod dedup;
pub mod error;
pub mod output;
pub mod processor;
pub mod reduce;
pub mod report;
pub mod worklist;

pub use processor::{run_verification, run_with_conf};
