// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Watch handler: a pull-by-exclusion session. Repeatedly issues a
//! rightmost-child interest under a name, refining `Exclude` after each
//! reply, until a deadline, interest budget, or `stop` command fires.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::CommandError,
    face::{Face, FaceEvent},
    process::{PROCESS_DELETE_TIME, WatchProcess, WatchTable},
    repo::RepoStorage,
    storage::StorageEngine,
    wire::{
        ChildSelector, Interest, Name, RepoCommandParameter, RepoCommandResponse,
        StatusCode, selectors::ExcludeEntry,
    },
};

use super::write::SharedRepo;

pub type SharedWatchTable = Arc<Mutex<WatchTable>>;

pub async fn start_watch<E: StorageEngine + 'static>(
    table: SharedWatchTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    param: RepoCommandParameter,
) -> Result<RepoCommandResponse, CommandError> {
    let name = param.name.clone().ok_or(CommandError::MissingParameter("Name"))?;
    let lifetime = param.interest_lifetime.unwrap_or(crate::process::DEFAULT_INTEREST_LIFETIME);

    let response = RepoCommandResponse::with_status(StatusCode::InProgress);
    let process = WatchProcess::new(response.clone(), param.watch_timeout, lifetime, param.max_interest_num);
    table.lock().await.0.insert(name.clone(), process);

    let initial_selectors = param.selectors.clone().unwrap_or_default();
    tokio::spawn(run_watch(table, repo, face, name, initial_selectors, lifetime));

    Ok(response)
}

async fn run_watch<E: StorageEngine + 'static>(
    table: SharedWatchTable,
    repo: SharedRepo<E>,
    face: Arc<dyn Face>,
    name: Name,
    mut selectors: crate::wire::Selectors,
    lifetime: Duration,
) {
    selectors.child_selector = Some(ChildSelector::Rightmost);
    loop {
        {
            let mut guard = table.lock().await;
            let Some(process) = guard.0.get_mut(&name) else { return };
            if process.should_stop() {
                finish(&mut guard, &name);
                drop(guard);
                schedule_gc_watch(table.clone(), name.clone());
                return;
            }
            process.issued_interests += 1;
        }

        let mut interest = Interest::new(name.clone()).with_lifetime(lifetime);
        interest.selectors = selectors.clone();

        let rx = face.express_interest(interest.clone());
        match rx.await {
            Ok(FaceEvent::Data(data)) => {
                let inserted = repo.lock().await.insert_data(&data).is_ok();
                let mut guard = table.lock().await;
                let Some(process) = guard.0.get_mut(&name) else { return };
                process.size += 1;
                if inserted {
                    let count = process.response.insert_num.unwrap_or(0) + 1;
                    process.response.insert_num = Some(count);
                }

                if data.name == interest.name {
                    selectors.min_suffix_components = Some(2);
                } else if data.name.len() > name.len() {
                    let boundary = data.name.0[name.len()].clone();
                    let mut refined = selectors.exclude.clone().unwrap_or_default();
                    refined.merge(&crate::wire::Exclude(vec![
                        ExcludeEntry::Any,
                        ExcludeEntry::Component(boundary),
                    ]));
                    selectors.exclude = Some(refined);
                }
                debug!(name = %name, issued = process.issued_interests, "watch data received");

                if process.should_stop() {
                    finish(&mut guard, &name);
                    drop(guard);
                    schedule_gc_watch(table.clone(), name.clone());
                    return;
                }
            },
            _ => {
                let mut guard = table.lock().await;
                let Some(process) = guard.0.get_mut(&name) else { return };
                if process.should_stop() {
                    finish(&mut guard, &name);
                    drop(guard);
                    schedule_gc_watch(table.clone(), name.clone());
                    return;
                }
            },
        }
    }
}

fn finish(guard: &mut WatchTable, name: &Name) {
    if let Some(process) = guard.0.get_mut(name) {
        process.running = false;
        process.response.status_code = Some(StatusCode::Completed as u64);
    }
}

fn schedule_gc_watch(table: SharedWatchTable, name: Name) {
    tokio::spawn(async move {
        tokio::time::sleep(PROCESS_DELETE_TIME).await;
        table.lock().await.0.remove(&name);
    });
}

pub async fn stop_watch(
    table: &SharedWatchTable,
    param: &RepoCommandParameter,
) -> Result<RepoCommandResponse, CommandError> {
    let name = param.name.clone().ok_or(CommandError::MissingParameter("Name"))?;
    let mut guard = table.lock().await;
    let process = guard.0.get_mut(&name).ok_or(CommandError::UnknownProcess)?;
    process.running = false;
    process.issued_interests = 0;
    process.response.status_code = Some(StatusCode::Stopped as u64);
    let response = process.response.clone();
    drop(guard);

    let table = table.clone();
    tokio::spawn(async move {
        tokio::time::sleep(PROCESS_DELETE_TIME).await;
        table.lock().await.0.remove(&name);
    });

    Ok(response)
}

pub async fn check_watch(
    table: &SharedWatchTable,
    param: &RepoCommandParameter,
) -> Result<RepoCommandResponse, CommandError> {
    let name = param.name.clone().ok_or(CommandError::MissingParameter("Name"))?;
    let guard = table.lock().await;
    let process = guard.0.get(&name).ok_or(CommandError::UnknownProcess)?;
    let mut response = process.response.clone();
    if !process.running {
        response.status_code = Some(StatusCode::Stopped as u64);
    }
    Ok(response)
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
        wire::{
            Data,
            data::{MetaInfo, Signature},
        },
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
    async fn watch_stops_after_max_interest_num() {
        let face = Arc::new(LoopbackFace::new());
        let table: SharedWatchTable = Arc::new(Mutex::new(WatchTable::default()));
        let engine = SqliteEngine::open_in_memory().expect("open");
        let repo: SharedRepo<SqliteEngine> =
            Arc::new(Mutex::new(RepoStorage::new(engine, 100).expect("repo")));

        let name = Name::from_uri("/w");
        let mut producer_rx = face.register_producer(name.clone());
        let mut counter = 0u64;
        tokio::spawn(async move {
            while let Some(pending) = producer_rx.recv().await {
                counter += 1;
                let child = pending.interest.name.append(
                    crate::wire::name::Component::from_bytes(counter.to_be_bytes().to_vec()),
                );
                pending.reply_data(data_for(child));
            }
        });

        let param = RepoCommandParameter {
            name: Some(name.clone()),
            max_interest_num: Some(3),
            ..Default::default()
        };
        start_watch(table.clone(), repo, face, param).await.expect("start");

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let check_param = RepoCommandParameter { name: Some(name.clone()), ..Default::default() };
            if let Ok(resp) = check_watch(&table, &check_param).await
                && resp.status_code == Some(StatusCode::Completed as u64)
            {
                assert_eq!(resp.insert_num, Some(3));
                return;
            }
        }
        panic!("watch did not complete in time");
    }
}
