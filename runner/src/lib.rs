// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Run external verifier processes.
//!
//! A verifier invocation runs on a background thread that owns the external
//! process. The controlling thread observes it by polling and can cancel it at
//! any point; a hard cancellation kills the process. The only
//! verifier-specific configuration is the [`conf::VerifierCmd`] used to launch
//! it.

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

pub mod conf;
pub mod path;
pub mod proc;
pub mod run;
