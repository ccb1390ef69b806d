//! # benchwatch
//!
//! Watches git branches and submits benchmark runs to a job-queue service
//! once per new commit.
//!
//! One invocation (`benchwatch check`) does, for every configured watch:
//!
//! - resolve the live tip of the branch ([`git::Inspector`]),
//! - compare it with the last commit acted on ([`core::state::StateStore`]),
//! - on a new tip, expand each run's variables with the commit hash
//!   ([`exec::template`]) and submit them in order ([`api::Submitter`]),
//! - record the tip only once every run of the watch was accepted.
//!
//! Failures are isolated per watch; see [`core::manager::Orchestrator`].

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod exec;
pub mod git;
pub mod log;
