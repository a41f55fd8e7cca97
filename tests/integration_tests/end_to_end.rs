// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use ndn_repo_rs::{
    handlers::command_frontend::CommandKind,
    repo::RepoStorage,
    storage::SqliteEngine,
    wire::{Interest, Name, RepoCommandParameter, StatusCode},
};
use tokio::time::sleep;

use crate::integration_tests::common::{build_harness, data_with};

#[tokio::test]
async fn single_insert_round_trips_end_to_end() {
    let (frontend, face) = build_harness();
    let name = Name::from_uri("/a/b/c");

    let mut producer_rx = face.register_producer(name.clone());
    tokio::spawn(async move {
        if let Some(pending) = producer_rx.recv().await {
            pending.reply_data(data_with("/a/b/c", &[3, 1, 4, 1, 5, 9, 2, 6]));
        }
    });

    let command_interest = Interest::new(Name::from_uri("/repo/insert"));
    let param = RepoCommandParameter { name: Some(name), ..Default::default() };
    let resp = frontend.dispatch(CommandKind::Insert, &command_interest, param).await;
    assert_eq!(resp.status_code, Some(StatusCode::InProgress as u64));
    let process_id = resp.process_id.expect("process id assigned");

    for _ in 0..25 {
        sleep(Duration::from_millis(20)).await;
        let check = RepoCommandParameter { process_id: Some(process_id), ..Default::default() };
        let check_interest =
            Interest::new(Name::from_uri("/repo").append(ndn_repo_rs::wire::Component::from_str("insert check")));
        let check_resp = frontend.dispatch(CommandKind::InsertCheck, &check_interest, check).await;
        if check_resp.status_code == Some(StatusCode::Completed as u64) {
            assert_eq!(check_resp.insert_num, Some(1));
            let guard = frontend.repo.lock().await;
            assert_eq!(guard.size(), 1);
            return;
        }
    }
    panic!("single insert did not complete in time");
}

#[tokio::test]
async fn delete_by_range_then_by_out_of_order_bounds() {
    let (frontend, _face) = build_harness();
    {
        let mut guard = frontend.repo.lock().await;
        for seg in 0..6u64 {
            let name = format!("/x/{seg}");
            guard.insert_data(&data_with(&name, b"seg")).expect("insert");
        }
        assert_eq!(guard.size(), 6);
    }

    let delete_interest = Interest::new(Name::from_uri("/repo/delete"));
    let param = RepoCommandParameter {
        name: Some(Name::from_uri("/x")),
        start_block_id: Some(2),
        end_block_id: Some(4),
        ..Default::default()
    };
    let resp = frontend.dispatch(CommandKind::Delete, &delete_interest, param).await;
    assert_eq!(resp.status_code, Some(StatusCode::Completed as u64));
    assert_eq!(resp.delete_num, Some(3));
    assert_eq!(frontend.repo.lock().await.size(), 3);

    let bad_range = RepoCommandParameter {
        name: Some(Name::from_uri("/x")),
        start_block_id: Some(5),
        end_block_id: Some(1),
        ..Default::default()
    };
    let resp = frontend.dispatch(CommandKind::Delete, &delete_interest, bad_range).await;
    assert_eq!(resp.status_code, Some(StatusCode::BadArguments as u64));
    assert_eq!(frontend.repo.lock().await.size(), 3);
}

#[tokio::test]
async fn capacity_limit_rejects_the_third_insert() {
    let engine = SqliteEngine::open_in_memory().expect("open sqlite");
    let mut repo = RepoStorage::new(engine, 2).expect("build repo");
    repo.insert_data(&data_with("/a", b"1")).expect("first insert");
    repo.insert_data(&data_with("/b", b"2")).expect("second insert");
    assert!(repo.insert_data(&data_with("/c", b"3")).is_err());
    assert_eq!(repo.size(), 2);
}
