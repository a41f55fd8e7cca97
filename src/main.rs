// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{net::ToSocketAddrs, sync::Arc};

use anyhow::{Context, Result};
use ndn_repo_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    face::{Face, LoopbackFace},
    handlers::{
        command_frontend::{
            AcceptAllValidator, AllowListValidator, CommandFrontend, CommandValidator, parse_command,
        },
        read::ReadHandler,
        tcp_bulk_insert,
    },
    process::{InsertTable, WatchTable},
    repo::RepoStorage,
    storage::SqliteEngine,
    wire::Name,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _init_logger = init_logger("config/logger.yaml")?;

    let cfg = resolve_config_path("config/repo.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let engine = SqliteEngine::open(&cfg.repo.storage.path)
        .with_context(|| format!("failed to open storage at {}", cfg.repo.storage.path))?;
    let repo = Arc::new(Mutex::new(
        RepoStorage::new(engine, cfg.repo.storage.max_packets).context("failed to build repo storage")?,
    ));
    info!(packets = repo.lock().await.size(), "repo storage opened");

    let loopback = Arc::new(LoopbackFace::new());
    let face: Arc<dyn Face> = loopback.clone();

    let read_handler = Arc::new(ReadHandler::new(face.clone(), cfg.repo.data.subset_length));
    {
        let read_handler = read_handler.clone();
        let events = repo.lock().await.subscribe();
        tokio::spawn(async move { read_handler.drive_auto_listen(events).await });
    }

    let validator: Arc<dyn CommandValidator> = if cfg.repo.validator.allow_all {
        Arc::new(AcceptAllValidator)
    } else {
        Arc::new(AllowListValidator { allowed: cfg.repo.validator.allowed_signers.clone() })
    };

    let frontend = Arc::new(CommandFrontend {
        validator,
        face: face.clone(),
        repo: repo.clone(),
        inserts: Arc::new(Mutex::new(InsertTable::default())),
        watches: Arc::new(Mutex::new(WatchTable::default())),
    });

    let command_prefixes: Vec<Name> =
        cfg.repo.command.prefixes.iter().map(|p| Name::from_uri(p)).collect();

    let cancel = CancellationToken::new();

    // Command interests arrive over the face; the production wire transport
    // is out of scope, so the loopback face's producer channel stands in for
    // it here, driven the same way the demo/test harnesses drive it.
    for prefix in &command_prefixes {
        let mut rx = loopback.register_producer(prefix.clone());
        let frontend = frontend.clone();
        let command_prefixes = command_prefixes.clone();
        tokio::spawn(async move {
            while let Some(pending) = rx.recv().await {
                let Some((kind, param)) = parse_command(&pending.interest, &command_prefixes) else {
                    continue;
                };
                let response = frontend.dispatch(kind, &pending.interest, param).await;
                if let Ok(el) = response.encode() {
                    let data = ndn_repo_rs::wire::Data {
                        name: pending.interest.name.clone(),
                        content: {
                            let mut buf = bytes::BytesMut::new();
                            el.encode(&mut buf);
                            buf.freeze()
                        },
                        meta: Default::default(),
                        signature: ndn_repo_rs::wire::data::Signature {
                            key_locator_hash: None,
                            bits: bytes::Bytes::new(),
                        },
                    };
                    pending.reply_data(data);
                }
            }
        });
    }

    let bind_addr = (cfg.repo.tcp_bulk_insert.host.as_str(), cfg.repo.tcp_bulk_insert.port)
        .to_socket_addrs()
        .context("failed to resolve tcp bulk-insert bind address")?
        .next()
        .context("tcp bulk-insert bind address resolved to no addresses")?;
    let listener =
        tcp_bulk_insert::bind_listener(bind_addr).context("failed to bind tcp bulk-insert listener")?;
    info!(
        host = %cfg.repo.tcp_bulk_insert.host,
        port = cfg.repo.tcp_bulk_insert.port,
        "tcp bulk-insert listening"
    );

    let accept_cancel = cancel.clone();
    let accept_repo = repo.clone();
    let accept_task = tokio::spawn(tcp_bulk_insert::accept_loop(listener, accept_repo, accept_cancel));

    shutdown_signal().await;
    info!("shutdown signal received, stopping");
    cancel.cancel();
    let _ = accept_task.await;

    Ok(())
}

/// Waits for a stop signal. `SIGINT`/`SIGTERM` (and the portable `ctrl_c()`
/// path) end the wait; `SIGHUP`/`SIGUSR1`/`SIGUSR2` are reserved for future
/// use (config reload, etc.) and are only logged and looped past.
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("install SIGHUP handler");
    let mut sigusr1 = signal(SignalKind::user_defined1()).expect("install SIGUSR1 handler");
    let mut sigusr2 = signal(SignalKind::user_defined2()).expect("install SIGUSR2 handler");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = sigterm.recv() => return,
            _ = sighup.recv() => info!("SIGHUP received, config reload is not implemented, ignoring"),
            _ = sigusr1.recv() => info!("SIGUSR1 received, reserved signal, ignoring"),
            _ = sigusr2.recv() => info!("SIGUSR2 received, reserved signal, ignoring"),
        }
    }
}
