// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Thin sketch of the consumer CLI role: iterates `segment` components
//! under a `version` component, fetching each over the loopback `Face`
//! until `FinalBlockId` is reached. Not the production `get` tool.

use std::sync::Arc;

use bytes::Bytes;
use ndn_repo_rs::{
    face::{Face, FaceEvent, LoopbackFace},
    handlers::delete::segment_component,
    wire::{
        Component, Data, Interest, Name,
        data::{MetaInfo, Signature},
    },
};

const LAST_SEGMENT: u64 = 3;

fn make_segment(base: &Name, seg: u64) -> Data {
    let mut meta = MetaInfo::default();
    if seg == LAST_SEGMENT {
        meta.final_block_id = Some(Component::from_bytes(seg.to_be_bytes().to_vec()));
    }
    Data {
        name: base.append(segment_component(seg)),
        content: Bytes::from(format!("segment {seg}").into_bytes()),
        meta,
        signature: Signature { key_locator_hash: None, bits: Bytes::new() },
    }
}

#[tokio::main]
async fn main() {
    let face = Arc::new(LoopbackFace::new());
    let base = Name::from_uri("/demo/consumer/item/v1");

    let producer_base = base.clone();
    let mut producer_rx = face.register_producer(base.clone());
    tokio::spawn(async move {
        while let Some(pending) = producer_rx.recv().await {
            let seg_component = pending.interest.name.0.last().expect("segment component present");
            let seg_no = u64::from_be_bytes(
                seg_component.0.as_ref().try_into().expect("8-byte segment number"),
            );
            pending.reply_data(make_segment(&producer_base, seg_no));
        }
    });

    let mut seg = 0u64;
    loop {
        let name = base.append(segment_component(seg));
        let interest = Interest::new(name);
        let rx = face.express_interest(interest);
        match rx.await {
            Ok(FaceEvent::Data(data)) => {
                println!("segment {seg}: {} bytes", data.content.len());
                if data.meta.final_block_id.is_some() {
                    break;
                }
            },
            _ => {
                println!("segment {seg} timed out");
                break;
            },
        }
        seg += 1;
    }
}
