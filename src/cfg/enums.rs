// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// The storage engine backing a repository. Only `Sqlite` is provided; the
/// `StorageEngine` trait is the seam a future engine would plug into.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMethod {
    #[serde(rename = "sqlite", alias = "Sqlite", alias = "SQLITE")]
    Sqlite,
}

impl fmt::Display for StorageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageMethod::Sqlite => "sqlite",
        })
    }
}
