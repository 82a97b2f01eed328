//! # TurnKey EC2 image build tool
//!
//! This crate converts a TurnKey appliance ISO build artifact into an
//! EBS-backed AMI.  All heavy lifting is delegated to external helper
//! programs; the logic here is parameter resolution, artifact naming,
//! bind-mount lifecycle management and sequencing of the external steps.

// See https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unused_must_use)]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]

pub mod cli;
pub(crate) mod convert;

pub(crate) mod buildenv;
pub(crate) mod buildlog;
pub(crate) mod config;
pub(crate) mod ebs;
pub(crate) mod flags;
pub(crate) mod identity;
pub(crate) mod iso;
pub(crate) mod mount;
pub(crate) mod names;
pub(crate) mod publish;
pub(crate) mod rootfs;
mod task;
mod utils;
