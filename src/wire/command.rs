// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Sparse command-parameter and command-response records: each field is
//! independently optional, encoded/decoded as TLV, with fixed type numbers
//! kept stable for wire compatibility (see [`crate::wire::wire_types`]).

use std::time::Duration;

use bytes::BytesMut;

use crate::{
    error::WireError,
    wire::{name::Name, selectors::Selectors, tlv::Element, varnumber, wire_types},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoCommandParameter {
    pub name: Option<Name>,
    pub start_block_id: Option<u64>,
    pub end_block_id: Option<u64>,
    pub process_id: Option<u64>,
    pub max_interest_num: Option<u64>,
    pub watch_timeout: Option<Duration>,
    pub interest_lifetime: Option<Duration>,
    pub selectors: Option<Selectors>,
}

impl RepoCommandParameter {
    /// Child ordering matches the reference TLV layout: ProcessId,
    /// EndBlockId, StartBlockId, MaxInterestNum, WatchTimeout,
    /// InterestLifetime, Selectors, Name — decoders must accept any order.
    pub fn encode(&self) -> Element {
        let mut buf = BytesMut::new();
        if let Some(v) = self.process_id {
            Element::nonneg(wire_types::PROCESS_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.end_block_id {
            Element::nonneg(wire_types::END_BLOCK_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.start_block_id {
            Element::nonneg(wire_types::START_BLOCK_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.max_interest_num {
            Element::nonneg(wire_types::MAX_INTEREST_NUM, v).encode(&mut buf);
        }
        if let Some(v) = self.watch_timeout {
            Element::nonneg(wire_types::WATCH_TIMEOUT, v.as_millis() as u64).encode(&mut buf);
        }
        if let Some(v) = self.interest_lifetime {
            Element::nonneg(wire_types::REPO_INTEREST_LIFETIME, v.as_millis() as u64)
                .encode(&mut buf);
        }
        if let Some(sel) = &self.selectors {
            sel.encode().encode(&mut buf);
        }
        if let Some(name) = &self.name {
            name.encode().encode(&mut buf);
        }
        Element::new(wire_types::REPO_COMMAND_PARAMETER, buf.freeze())
    }

    pub fn decode(el: &Element) -> Result<RepoCommandParameter, WireError> {
        if el.typ != wire_types::REPO_COMMAND_PARAMETER {
            return Err(WireError::UnexpectedType {
                expected: wire_types::REPO_COMMAND_PARAMETER,
                found: el.typ,
            });
        }
        let mut out = RepoCommandParameter::default();
        for child in el.children()? {
            match child.typ {
                wire_types::NAME => out.name = Some(Name::decode(&child)?),
                wire_types::START_BLOCK_ID => {
                    out.start_block_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::END_BLOCK_ID => {
                    out.end_block_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::PROCESS_ID => {
                    out.process_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::MAX_INTEREST_NUM => {
                    out.max_interest_num = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::WATCH_TIMEOUT => {
                    out.watch_timeout =
                        Some(Duration::from_millis(varnumber::decode_nonneg(&child.value)?))
                },
                wire_types::REPO_INTEREST_LIFETIME => {
                    out.interest_lifetime =
                        Some(Duration::from_millis(varnumber::decode_nonneg(&child.value)?))
                },
                wire_types::SELECTORS => out.selectors = Some(Selectors::decode(&child)?),
                _ => {},
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum StatusCode {
    InProgress = 100,
    Stopped = 101,
    Completed = 200,
    Running = 300,
    Unauthorized = 401,
    MalformedParameters = 402,
    BadArguments = 403,
    UnknownProcess = 404,
    NoEndTimeout = 405,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoCommandResponse {
    pub status_code: Option<u64>,
    pub start_block_id: Option<u64>,
    pub end_block_id: Option<u64>,
    pub process_id: Option<u64>,
    pub insert_num: Option<u64>,
    pub delete_num: Option<u64>,
}

impl RepoCommandResponse {
    pub fn with_status(status: StatusCode) -> Self {
        Self { status_code: Some(status as u64), ..Default::default() }
    }

    pub fn encode(&self) -> Result<Element, WireError> {
        let status = self.status_code.ok_or(WireError::MissingField("StatusCode"))?;
        let mut buf = BytesMut::new();
        Element::nonneg(wire_types::STATUS_CODE, status).encode(&mut buf);
        if let Some(v) = self.process_id {
            Element::nonneg(wire_types::PROCESS_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.start_block_id {
            Element::nonneg(wire_types::START_BLOCK_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.end_block_id {
            Element::nonneg(wire_types::END_BLOCK_ID, v).encode(&mut buf);
        }
        if let Some(v) = self.insert_num {
            Element::nonneg(wire_types::INSERT_NUM, v).encode(&mut buf);
        }
        if let Some(v) = self.delete_num {
            Element::nonneg(wire_types::DELETE_NUM, v).encode(&mut buf);
        }
        Ok(Element::new(wire_types::REPO_COMMAND_RESPONSE, buf.freeze()))
    }

    pub fn decode(el: &Element) -> Result<RepoCommandResponse, WireError> {
        if el.typ != wire_types::REPO_COMMAND_RESPONSE {
            return Err(WireError::UnexpectedType {
                expected: wire_types::REPO_COMMAND_RESPONSE,
                found: el.typ,
            });
        }
        let mut out = RepoCommandResponse::default();
        for child in el.children()? {
            match child.typ {
                wire_types::STATUS_CODE => {
                    out.status_code = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::PROCESS_ID => {
                    out.process_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::START_BLOCK_ID => {
                    out.start_block_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::END_BLOCK_ID => {
                    out.end_block_id = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::INSERT_NUM => {
                    out.insert_num = Some(varnumber::decode_nonneg(&child.value)?)
                },
                wire_types::DELETE_NUM => {
                    out.delete_num = Some(varnumber::decode_nonneg(&child.value)?)
                },
                _ => {},
            }
        }
        if out.status_code.is_none() {
            return Err(WireError::MissingField("StatusCode"));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_round_trips() {
        let param = RepoCommandParameter {
            name: Some(Name::from_uri("/a")),
            start_block_id: Some(0),
            end_block_id: Some(9),
            process_id: Some(42),
            ..Default::default()
        };
        let el = param.encode();
        let decoded = RepoCommandParameter::decode(&el).expect("decode");
        assert_eq!(param, decoded);
    }

    #[test]
    fn response_requires_status_code() {
        let resp = RepoCommandResponse::default();
        assert!(resp.encode().is_err());
    }

    #[test]
    fn response_round_trips() {
        let resp = RepoCommandResponse {
            status_code: Some(StatusCode::Completed as u64),
            insert_num: Some(10),
            ..Default::default()
        };
        let el = resp.encode().expect("encode");
        let decoded = RepoCommandResponse::decode(&el).expect("decode");
        assert_eq!(resp, decoded);
    }
}
