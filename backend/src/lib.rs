// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Verification backends.
//!
//! A backend turns properties into queries in its own query language and
//! executes a query file against a model, returning a verdict and possibly a
//! trace. The rest of the system treats every backend uniformly through the
//! [`imp::Backend`] trait; one backend is selected per run with a
//! [`conf::BackendConf`].

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

pub mod backends;
pub mod conf;
pub mod imp;
pub mod query;
pub mod serialize;
pub mod verifier;
