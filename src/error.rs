// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Layered error taxonomy. Each layer gets its own small enum; callers at the
//! binary/handler boundary wrap these with [`anyhow::Context`] rather than
//! matching on variants they don't own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer ended before a complete TLV element")]
    Truncated,
    #[error("VarNumber encoding was not shortest-form")]
    NonMinimalVarNumber,
    #[error("expected outer type {expected}, found {found}")]
    UnexpectedType { expected: u64, found: u64 },
    #[error("required field {0} missing")]
    MissingField(&'static str),
    #[error("length field does not match a 1/2/4/8-byte non-negative integer")]
    BadIntegerLength,
    #[error("name component exceeds the length implied by its TLV")]
    ComponentOverrun,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index is at capacity ({0} entries)")]
    Capacity(u64),
    #[error("an entry with that full name already exists")]
    Duplicate,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage engine I/O failure: {0}")]
    Io(String),
    #[error("row {0} not found")]
    NotFound(u64),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("selectors may not be combined with start/end block ids")]
    SelectorsConflictWithBlockIds,
    #[error("start_block_id must not exceed end_block_id")]
    BadBlockRange,
    #[error("unknown process id")]
    UnknownProcess,
    #[error("command interest failed authorization")]
    Unauthorized,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signature rejected")]
    SignatureRejected,
    #[error("signer not on the allow list")]
    NotAllowed,
}
