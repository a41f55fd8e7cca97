// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::StorageMethod;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Everything the repository itself needs: prefixes, storage,
    /// transport, and authorization policy.
    pub repo: RepoConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RepoConfig {
    /// Data prefixes this repository serves reads under.
    pub data: DataConfig,
    /// Command prefixes accepting insert/delete/watch commands.
    pub command: CommandConfig,
    /// The framed bulk-insert TCP acceptor.
    pub tcp_bulk_insert: TcpBulkInsertConfig,
    /// The storage engine.
    pub storage: StorageConfig,
    /// Command authorization policy.
    #[serde(default)]
    pub validator: ValidatorConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DataConfig {
    #[serde(rename = "prefix")]
    pub prefixes: Vec<String>,
    /// Number of leading components used as the auto-listen registration
    /// key; entries sharing a prefix share one face registration.
    #[serde(default = "default_subset_length")]
    pub subset_length: usize,
}

fn default_subset_length() -> usize {
    2
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommandConfig {
    #[serde(rename = "prefix")]
    pub prefixes: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TcpBulkInsertConfig {
    #[serde(default = "default_tcp_host")]
    pub host: String,
    #[serde(default = "default_tcp_port")]
    pub port: u16,
}

fn default_tcp_host() -> String {
    "localhost".to_string()
}

fn default_tcp_port() -> u16 {
    7376
}

impl Default for TcpBulkInsertConfig {
    fn default() -> Self {
        Self { host: default_tcp_host(), port: default_tcp_port() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StorageConfig {
    pub method: StorageMethod,
    pub path: String,
    #[serde(rename = "max-packets")]
    pub max_packets: u64,
}

/// Pluggable authorization policy. `allow_all` mirrors the out-of-scope
/// production validator being a no-op stand-in; `allowed_signers` drives
/// [`crate::handlers::command_frontend::AllowListValidator`] for local
/// testing/demo use.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub allow_all: bool,
    #[serde(default)]
    pub allowed_signers: Vec<String>,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.repo.data.prefixes.is_empty(),
            "repo.data.prefix must list at least one prefix"
        );
        ensure!(
            !self.repo.command.prefixes.is_empty(),
            "repo.command.prefix must list at least one prefix"
        );
        ensure!(self.repo.storage.max_packets >= 1, "repo.storage.max-packets must be >= 1");
        ensure!(!self.repo.storage.path.is_empty(), "repo.storage.path must not be empty");
        ensure!(
            self.repo.data.subset_length >= 1,
            "repo.data.subset_length must be >= 1"
        );

        if !self.repo.validator.allow_all && self.repo.validator.allowed_signers.is_empty() {
            // No explicit policy configured: default to permissive, matching
            // the out-of-scope production validator being a pluggable no-op.
            self.repo.validator.allow_all = true;
        }

        Ok(())
    }
}

/// Serde helper for representing `Duration` as a number of milliseconds,
/// used by the insert/watch command timers.
pub mod serde_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
