// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Write handler: the insertion state machine. Single-packet, segmented
//! with a known end, and segmented with an unknown end (credit window,
//! retry budget, no-end timeout extension on `check`).
//!
//! The fetch loop is a plain async task funnelling events through the
//! process table's mutex rather than a generic state-machine trait with
//! per-state associated futures — that machinery pays for itself when one
//! opcode dispatches into many distinct next states; a credit-window fetch
//! loop has exactly one shape and one exit, so the indirection buys
//! nothing here (see DESIGN.md).

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    error::CommandError,
    face::{Face, FaceEvent},
    process::{
        DEFAULT_CREDIT, InsertProcess, InsertTable, NOEND_TIMEOUT, PROCESS_DELETE_TIME,
        RETRY_TIMEOUT, SegmentNo,
    },
    repo::RepoStorage,
    storage::StorageEngine,
    wire::{
        Interest, Name, RepoCommandParameter, RepoCommandResponse, StatusCode,
        data::Data,
    },
};

use super::delete::segment_component;

pub type SharedInsertTable = Arc<Mutex<InsertTable>>;
pub type SharedRepo<E> = Arc<Mutex<RepoStorage<E>>>;

/// Validates and dispatches an `insert` command, returning the immediate
/// "accepted" response. Segmented sessions spawn a background task that
/// drives fetching; the caller does not await it.
pub async fn start_insert<E: StorageEngine + 'static>(
    table: SharedInsertTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    param: RepoCommandParameter,
) -> Result<RepoCommandResponse, CommandError> {
    let name = param.name.clone().ok_or(CommandError::MissingParameter("Name"))?;
    if param.selectors.is_some()
        && (param.start_block_id.is_some() || param.end_block_id.is_some())
    {
        return Ok(RepoCommandResponse::with_status(StatusCode::MalformedParameters));
    }

    let process_id = InsertTable::new_process_id();
    let lifetime = param.interest_lifetime.unwrap_or(crate::process::DEFAULT_INTEREST_LIFETIME);

    if param.start_block_id.is_none() && param.end_block_id.is_none() {
        return Ok(start_single(table, repo, face, name, process_id, lifetime).await);
    }

    let start = param.start_block_id.unwrap_or(0);
    let mut response = RepoCommandResponse::with_status(StatusCode::InProgress);
    response.process_id = Some(process_id);
    response.insert_num = Some(0);
    response.start_block_id = Some(start);
    if let Some(end) = param.end_block_id {
        response.end_block_id = Some(end);
    }

    let process = InsertProcess::new(response.clone());
    table.lock().await.0.insert(process_id, process);

    tokio::spawn(run_segmented(
        table,
        repo,
        face,
        name,
        process_id,
        start,
        param.end_block_id,
        lifetime,
    ));

    Ok(response)
}

async fn start_single<E: StorageEngine + 'static>(
    table: SharedInsertTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    name: Name,
    process_id: u64,
    lifetime: Duration,
) -> RepoCommandResponse {
    let mut response = RepoCommandResponse::with_status(StatusCode::InProgress);
    response.process_id = Some(process_id);
    response.insert_num = Some(0);

    let process = InsertProcess::new(response.clone());
    table.lock().await.0.insert(process_id, process);

    tokio::spawn(async move {
        let interest = Interest::new(name).with_lifetime(lifetime);
        let rx = face.express_interest(interest);
        match rx.await {
            Ok(FaceEvent::Data(data)) => {
                let mut guard = table.lock().await;
                let Some(process) = guard.0.get_mut(&process_id) else { return };
                match repo.lock().await.insert_data(&data) {
                    Ok(_) => {
                        process.response.status_code = Some(StatusCode::Completed as u64);
                        process.response.insert_num = Some(1);
                    },
                    Err(e) => {
                        warn!(error = %e, "single insert failed to store data");
                        process.response.status_code = Some(StatusCode::Completed as u64);
                        process.response.insert_num = Some(0);
                    },
                }
                drop(guard);
                schedule_gc(table.clone(), process_id);
            },
            _ => {
                // Ambiguous-by-design: on single-insert timeout the process
                // is erased immediately, no 405 reply. Callers see 404 on
                // the next `insert check`.
                table.lock().await.0.remove(&process_id);
            },
        }
    });

    response
}

#[allow(clippy::too_many_arguments)]
async fn run_segmented<E: StorageEngine + 'static>(
    table: SharedInsertTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    name: Name,
    process_id: u64,
    start: SegmentNo,
    mut end: Option<SegmentNo>,
    lifetime: Duration,
) {
    {
        let mut guard = table.lock().await;
        let Some(process) = guard.0.get_mut(&process_id) else { return };
        let window = end.map(|e| e.saturating_sub(start) + 1).unwrap_or(u64::MAX);
        process.credit = DEFAULT_CREDIT.min(window as i64).max(0);
        if end.is_none() {
            process.no_end_deadline = Some(tokio::time::Instant::now().into_std() + NOEND_TIMEOUT);
        }
        process.next_segment = start;
    }

    loop {
        // Top up outstanding fetches up to the session's current credit.
        let to_send = {
            let mut guard = table.lock().await;
            let Some(process) = guard.0.get_mut(&process_id) else { return };
            if process.response.status_code != Some(StatusCode::InProgress as u64) {
                return;
            }
            let mut batch = Vec::new();
            // Retries are resent without spending credit — they were
            // already accounted for when first sent.
            while let Some(seg) = process.next_segment_queue.pop_front() {
                batch.push(seg);
            }
            while process.credit > 0 {
                let seg = process.next_segment;
                if let Some(e) = end
                    && seg > e
                {
                    break;
                }
                process.credit -= 1;
                process.retry_counts.insert(seg, 0);
                process.next_segment += 1;
                batch.push(seg);
            }
            batch
        };

        for seg in to_send {
            let table = table.clone();
            let repo = repo.clone();
            let face = face.clone();
            let seg_name = name.append(segment_component(seg));
            tokio::spawn(fetch_segment(
                table, repo, face, seg_name, process_id, seg, lifetime,
            ));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        if is_terminal(&table, process_id).await {
            return;
        }
        // Resync `end` in case a segment's FinalBlockId tightened it.
        if let Some(process) = table.lock().await.0.get(&process_id) {
            end = process.response.end_block_id;
        } else {
            return;
        }
    }
}

async fn is_terminal(table: &SharedInsertTable, process_id: u64) -> bool {
    let guard = table.lock().await;
    match guard.0.get(&process_id) {
        Some(p) => {
            let code = p.response.status_code;
            code == Some(StatusCode::Completed as u64) || code == Some(StatusCode::NoEndTimeout as u64)
        },
        None => true,
    }
}

#[allow(clippy::too_many_arguments)]
async fn fetch_segment<E: StorageEngine + 'static>(
    table: SharedInsertTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    seg_name: Name,
    process_id: u64,
    seg: SegmentNo,
    lifetime: Duration,
) {
    let interest = Interest::new(seg_name).with_lifetime(lifetime);
    let rx = face.express_interest(interest);
    match rx.await {
        Ok(FaceEvent::Data(data)) => on_segment_data(table, repo, process_id, seg, data).await,
        _ => on_segment_timeout(table, process_id, seg).await,
    }
}

async fn on_segment_data<E: StorageEngine + 'static>(
    table: SharedInsertTable,
    repo: SharedRepo<E>,
    process_id: u64,
    seg: SegmentNo,
    data: Data,
) {
    let inserted = repo.lock().await.insert_data(&data).is_ok();

    let mut guard = table.lock().await;
    let Some(process) = guard.0.get_mut(&process_id) else { return };
    process.credit += 1;

    if let Some(fbi) = &data.meta.final_block_id
        && let Ok(fbi_val) = crate::wire::varnumber::decode_nonneg(&fbi.0)
    {
        let current_end = process.response.end_block_id.unwrap_or(u64::MAX);
        if fbi_val < current_end {
            process.response.end_block_id = Some(fbi_val);
        }
        process.no_end_deadline = None;
    }

    if inserted {
        let count = process.response.insert_num.unwrap_or(0) + 1;
        process.response.insert_num = Some(count);
    }

    if let Some(end) = process.response.end_block_id {
        let start = process.response.start_block_id.unwrap_or(0);
        let expected = end.saturating_sub(start) + 1;
        if process.response.insert_num.unwrap_or(0) >= expected {
            process.response.status_code = Some(StatusCode::Completed as u64);
            drop(guard);
            schedule_gc(table, process_id);
            return;
        }
    } else if let Some(deadline) = process.no_end_deadline
        && tokio::time::Instant::now().into_std() > deadline
    {
        process.response.status_code = Some(StatusCode::NoEndTimeout as u64);
        drop(guard);
        schedule_gc(table, process_id);
        return;
    }

    debug!(process_id, seg, "segment stored");
}

async fn on_segment_timeout(table: SharedInsertTable, process_id: u64, seg: SegmentNo) {
    let mut guard = table.lock().await;
    let Some(process) = guard.0.get_mut(&process_id) else { return };

    let retries = process.retry_counts.entry(seg).or_insert(0);
    if *retries >= RETRY_TIMEOUT {
        warn!(process_id, seg, "segment retry budget exhausted, failing process");
        guard.0.remove(&process_id);
        return;
    }
    *retries += 1;
    process.next_segment_queue.push_back(seg);
    warn!(process_id, seg, retries = *retries, "segment timed out, will retry");
}

fn schedule_gc(table: SharedInsertTable, process_id: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(PROCESS_DELETE_TIME).await;
        table.lock().await.0.remove(&process_id);
    });
}

/// Answers an `insert check` command. Extends the no-end deadline for a
/// still-indefinite, in-progress session regardless of anything else about
/// the request — the original's behavior, preserved deliberately.
pub async fn check_insert(
    table: &SharedInsertTable,
    param: &RepoCommandParameter,
) -> Result<RepoCommandResponse, CommandError> {
    let process_id = param.process_id.ok_or(CommandError::MissingParameter("ProcessId"))?;
    let mut guard = table.lock().await;
    let process = guard.0.get_mut(&process_id).ok_or(CommandError::UnknownProcess)?;

    if process.response.end_block_id.is_none()
        && process.response.status_code == Some(StatusCode::InProgress as u64)
    {
        match process.no_end_deadline {
            Some(deadline) if tokio::time::Instant::now().into_std() > deadline => {
                process.response.status_code = Some(StatusCode::NoEndTimeout as u64);
            },
            _ => {
                process.no_end_deadline =
                    Some(tokio::time::Instant::now().into_std() + NOEND_TIMEOUT);
            },
        }
    }

    Ok(process.response.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        face::LoopbackFace,
        storage::SqliteEngine,
        wire::data::{MetaInfo, Signature},
    };

    fn data_for(name: Name) -> Data {
        Data {
            name,
            content: Bytes::from_static(b"x"),
            meta: MetaInfo::default(),
            signature: Signature { key_locator_hash: None, bits: Bytes::new() },
        }
    }

    #[tokio::test]
    async fn single_insert_completes_when_producer_answers() {
        let face = Arc::new(LoopbackFace::new());
        let table: SharedInsertTable = Arc::new(Mutex::new(InsertTable::default()));
        let engine = SqliteEngine::open_in_memory().expect("open");
        let repo: SharedRepo<SqliteEngine> = Arc::new(Mutex::new(
            RepoStorage::new(engine, 100).expect("repo"),
        ));

        let name = Name::from_uri("/a/b/c");
        let mut producer_rx = face.register_producer(name.clone());
        tokio::spawn(async move {
            if let Some(pending) = producer_rx.recv().await {
                let data = data_for(pending.interest.name.clone());
                pending.reply_data(data);
            }
        });

        let param = RepoCommandParameter { name: Some(name), ..Default::default() };
        let resp = start_insert(table.clone(), repo.clone(), face, param)
            .await
            .expect("start");
        assert_eq!(resp.status_code, Some(StatusCode::InProgress as u64));
        let process_id = resp.process_id.expect("process id");

        // Give the spawned task a moment to complete.
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let check_param = RepoCommandParameter { process_id: Some(process_id), ..Default::default() };
            let check = check_insert(&table, &check_param).await.expect("check");
            if check.status_code == Some(StatusCode::Completed as u64) {
                assert_eq!(check.insert_num, Some(1));
                return;
            }
        }
        panic!("single insert did not complete in time");
    }

    #[tokio::test]
    async fn selectors_with_block_ids_are_rejected() {
        let face = Arc::new(LoopbackFace::new());
        let table: SharedInsertTable = Arc::new(Mutex::new(InsertTable::default()));
        let engine = SqliteEngine::open_in_memory().expect("open");
        let repo: SharedRepo<SqliteEngine> = Arc::new(Mutex::new(
            RepoStorage::new(engine, 100).expect("repo"),
        ));
        let param = RepoCommandParameter {
            name: Some(Name::from_uri("/a")),
            start_block_id: Some(0),
            end_block_id: Some(1),
            selectors: Some(Default::default()),
            ..Default::default()
        };
        let resp = start_insert(table, repo, face, param).await.expect("start");
        assert_eq!(resp.status_code, Some(StatusCode::MalformedParameters as u64));
    }
}
