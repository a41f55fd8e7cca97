// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Delete handler: single-name, segmented-range, and selector-driven
//! deletion, all answered synchronously (no long-lived process state).

use crate::{
    repo::RepoStorage,
    storage::StorageEngine,
    wire::{
        ChildSelector, Interest, RepoCommandParameter, RepoCommandResponse, StatusCode,
        name::{Component, Name},
    },
};

pub fn segment_component(segment: u64) -> Component {
    Component::from_bytes(segment.to_be_bytes().to_vec())
}

pub fn handle_delete<E: StorageEngine>(
    repo: &mut RepoStorage<E>,
    param: &RepoCommandParameter,
) -> RepoCommandResponse {
    let Some(name) = &param.name else {
        return RepoCommandResponse::with_status(StatusCode::BadArguments);
    };

    if let Some(selectors) = &param.selectors {
        if param.start_block_id.is_some() || param.end_block_id.is_some() {
            return RepoCommandResponse::with_status(StatusCode::MalformedParameters);
        }
        let mut interest = Interest::new(name.clone());
        interest.selectors = selectors.clone();
        interest.selectors.child_selector = Some(ChildSelector::Leftmost);
        let removed = repo.delete_by_interest(&interest);
        return respond(removed);
    }

    match (param.start_block_id, param.end_block_id) {
        (None, None) => respond(repo.delete_by_name(name)),
        (start, Some(end)) => {
            let start = start.unwrap_or(0);
            if start > end {
                return RepoCommandResponse::with_status(StatusCode::BadArguments);
            }
            let mut removed = 0i64;
            let mut failed = false;
            for seg in start..=end {
                let seg_name = name.append(segment_component(seg));
                let r = repo.delete_by_name(&seg_name);
                if r < 0 {
                    failed = true;
                } else {
                    removed += r;
                }
            }
            respond(if failed { -1 } else { removed })
        },
        (Some(_), None) => RepoCommandResponse::with_status(StatusCode::BadArguments),
    }
}

fn respond(removed: i64) -> RepoCommandResponse {
    if removed < 0 {
        RepoCommandResponse::with_status(StatusCode::NoEndTimeout)
    } else {
        let mut resp = RepoCommandResponse::with_status(StatusCode::Completed);
        resp.delete_num = Some(removed as u64);
        resp
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        storage::SqliteEngine,
        wire::{
            Data,
            data::{MetaInfo, Signature},
        },
    };

    fn data(n: &str) -> Data {
        Data {
            name: Name::from_uri(n),
            content: Bytes::from_static(b"x"),
            meta: MetaInfo::default(),
            signature: Signature { key_locator_hash: None, bits: Bytes::new() },
        }
    }

    fn repo_with_segments(prefix: &str, count: u64) -> RepoStorage<SqliteEngine> {
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 100).expect("repo");
        for seg in 0..count {
            let name = Name::from_uri(prefix).append(segment_component(seg));
            repo.insert_data(&Data {
                name,
                content: Bytes::from_static(b"x"),
                meta: MetaInfo::default(),
                signature: Signature { key_locator_hash: None, bits: Bytes::new() },
            })
            .expect("insert");
        }
        repo
    }

    #[test]
    fn deletes_a_segment_range() {
        let mut repo = repo_with_segments("/x", 6);
        let param = RepoCommandParameter {
            name: Some(Name::from_uri("/x")),
            start_block_id: Some(2),
            end_block_id: Some(4),
            ..Default::default()
        };
        let resp = handle_delete(&mut repo, &param);
        assert_eq!(resp.status_code, Some(StatusCode::Completed as u64));
        assert_eq!(resp.delete_num, Some(3));
        assert_eq!(repo.size(), 3);
    }

    #[test]
    fn start_greater_than_end_is_rejected() {
        let mut repo = repo_with_segments("/x", 3);
        let param = RepoCommandParameter {
            name: Some(Name::from_uri("/x")),
            start_block_id: Some(4),
            end_block_id: Some(1),
            ..Default::default()
        };
        let resp = handle_delete(&mut repo, &param);
        assert_eq!(resp.status_code, Some(StatusCode::BadArguments as u64));
        assert_eq!(repo.size(), 3);
    }

    #[test]
    fn exact_name_delete_removes_everything_under_prefix() {
        let d = data("/y");
        let engine = SqliteEngine::open_in_memory().expect("open");
        let mut repo = RepoStorage::new(engine, 100).expect("repo");
        repo.insert_data(&d).expect("insert");
        let param = RepoCommandParameter { name: Some(Name::from_uri("/y")), ..Default::default() };
        let resp = handle_delete(&mut repo, &param);
        assert_eq!(resp.delete_num, Some(1));
        assert_eq!(repo.size(), 0);
    }
}
