// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The TLV wire codec: VarNumbers, generic elements, names, selectors,
//! interests, data packets, and the repo command records. Every higher
//! layer builds on [`tlv::Element`] rather than hand-rolling framing.

pub mod command;
pub mod data;
pub mod interest;
pub mod name;
pub mod selectors;
pub mod tlv;
pub mod varnumber;
pub mod wire_types;

pub use command::{RepoCommandParameter, RepoCommandResponse, StatusCode};
pub use data::Data;
pub use interest::Interest;
pub use name::{Component, Name};
pub use selectors::{ChildSelector, Exclude, Selectors};
