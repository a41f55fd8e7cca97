// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Framed TCP bulk-insert acceptor. Grounded directly on the original's
//! `tcp-bulk-insert-handle.cpp`: an 8800-byte input buffer, parse-in-place,
//! shift-residual-forward on a partial read, and close the connection if
//! the buffer fills without completing a single element.

use std::net::SocketAddr;

use socket2::{Domain, Socket, Type};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    repo::RepoStorage,
    storage::StorageEngine,
    wire::{Data, tlv},
};

pub const MAX_NDN_PACKET_SIZE: usize = 8800;

pub fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    TcpListener::from_std(socket.into())
}

pub async fn accept_loop<E: StorageEngine + 'static>(
    listener: TcpListener,
    repo: std::sync::Arc<tokio::sync::Mutex<RepoStorage<E>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => {
                let Ok((stream, peer)) = accepted else { continue };
                let repo = repo.clone();
                let cancel = cancel.child_token();
                tokio::spawn(async move {
                    handle_connection(stream, peer, repo, cancel).await;
                });
            }
        }
    }
}

async fn handle_connection<E: StorageEngine + 'static>(
    mut stream: TcpStream,
    peer: SocketAddr,
    repo: std::sync::Arc<tokio::sync::Mutex<RepoStorage<E>>>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_NDN_PACKET_SIZE];
    let mut filled = 0usize;

    loop {
        if filled == buf.len() {
            // Buffer is full and nothing useful was parsed out of it below;
            // treated as malformed input.
            warn!(%peer, "tcp bulk-insert buffer full without a complete element, closing");
            let _ = stream.shutdown().await;
            return;
        }

        let n = tokio::select! {
            _ = cancel.cancelled() => return,
            r = stream.read(&mut buf[filled..]) => match r {
                Ok(0) => return, // peer closed
                Ok(n) => n,
                Err(e) => {
                    warn!(%peer, error = %e, "tcp bulk-insert read error");
                    return;
                },
            },
        };
        filled += n;

        let (elements, residual) = tlv::decode_stream(&buf[..filled]);
        if elements.is_empty() && residual == buf.len() {
            warn!(%peer, "tcp bulk-insert buffer full without a complete element, closing");
            let _ = stream.shutdown().await;
            return;
        }

        for el in elements {
            match Data::decode(&el) {
                Ok(data) => {
                    let mut guard = repo.lock().await;
                    match guard.insert_data(&data) {
                        Ok(name) => debug!(%peer, name = %name, "bulk inserted"),
                        Err(e) => debug!(%peer, error = %e, "bulk insert skipped duplicate/failure"),
                    }
                },
                Err(e) => warn!(%peer, error = %e, "bulk insert decode error, skipped"),
            }
        }

        // Shift the residual bytes to the front and continue reading.
        let consumed = filled - residual;
        buf.copy_within(consumed..filled, 0);
        filled = residual;
    }
}
