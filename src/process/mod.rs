// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared process-table state for the write and watch handlers: both key
//! a long-lived session (by process id or by watched name) and both need a
//! deferred-GC delay after completion so a status check still succeeds.

use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

use crate::wire::{Name, RepoCommandResponse};

pub const PROCESS_DELETE_TIME: Duration = Duration::from_secs(10);
pub const NOEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const RETRY_TIMEOUT: u32 = 3;
pub const DEFAULT_CREDIT: i64 = 12;
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

pub type SegmentNo = u64;

/// State for one segmented-insert session.
pub struct InsertProcess {
    pub response: RepoCommandResponse,
    pub next_segment_queue: VecDeque<SegmentNo>,
    pub next_segment: SegmentNo,
    pub retry_counts: HashMap<SegmentNo, u32>,
    pub credit: i64,
    pub no_end_deadline: Option<Instant>,
    pub cancel: CancellationToken,
}

impl InsertProcess {
    pub fn new(response: RepoCommandResponse) -> Self {
        Self {
            response,
            next_segment_queue: VecDeque::new(),
            next_segment: 0,
            retry_counts: HashMap::new(),
            credit: 0,
            no_end_deadline: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// State for one watch session, keyed by the watched name.
pub struct WatchProcess {
    pub response: RepoCommandResponse,
    pub running: bool,
    pub issued_interests: u64,
    pub size: u64,
    pub start: Instant,
    pub watch_timeout: Option<Duration>,
    pub interest_lifetime: Duration,
    pub max_interest_num: Option<u64>,
    pub cancel: CancellationToken,
}

impl WatchProcess {
    pub fn new(
        response: RepoCommandResponse,
        watch_timeout: Option<Duration>,
        interest_lifetime: Duration,
        max_interest_num: Option<u64>,
    ) -> Self {
        Self {
            response,
            running: true,
            issued_interests: 0,
            size: 0,
            start: Instant::now(),
            watch_timeout,
            interest_lifetime,
            max_interest_num,
            cancel: CancellationToken::new(),
        }
    }

    pub fn should_stop(&self) -> bool {
        if !self.running {
            return true;
        }
        if let Some(timeout) = self.watch_timeout
            && self.start.elapsed() > timeout
        {
            return true;
        }
        if let Some(max) = self.max_interest_num
            && self.issued_interests >= max
        {
            return true;
        }
        false
    }
}

/// Table of insert sessions keyed by their random 64-bit process id.
#[derive(Default)]
pub struct InsertTable(pub HashMap<u64, InsertProcess>);

/// Table of watch sessions keyed by the watched name.
#[derive(Default)]
pub struct WatchTable(pub HashMap<Name, WatchProcess>);

impl InsertTable {
    pub fn new_process_id() -> u64 {
        rand::random()
    }
}
