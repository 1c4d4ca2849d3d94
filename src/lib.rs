// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod db;
pub mod engine;
pub mod error;
pub mod importer;
pub mod models;
pub mod reports;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
pub use store::Ledger;
