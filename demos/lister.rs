// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Thin sketch of the lister CLI role: opens the configured sqlite storage
//! and dumps every stored full name. Takes the storage path as the first
//! CLI argument, defaulting to `repo.sqlite`. Not the production `ls` tool.

use ndn_repo_rs::storage::{SqliteEngine, StorageEngine};

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "repo.sqlite".to_string());
    let engine = SqliteEngine::open(&path).expect("open storage");

    let mut names = Vec::new();
    engine
        .enumerate(&mut |meta| names.push(meta.full_name))
        .expect("enumerate storage");
    names.sort();

    for name in &names {
        println!("{name}");
    }
    println!("{} packets", names.len());
}
