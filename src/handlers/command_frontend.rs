// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Command frontend: authorization, parameter decode, and dispatch to the
//! write/watch/delete handlers. The production validator (signature
//! verification) is the external collaborator named out of scope in the
//! overview; [`AllowListValidator`] and [`AcceptAllValidator`] below are
//! the pluggable stand-ins the config selects between for local/demo use.

use std::sync::Arc;

use tracing::warn;

use crate::{
    error::AuthError,
    face::Face,
    handlers::{delete, watch, write},
    wire::{Interest, Name, RepoCommandParameter, RepoCommandResponse, StatusCode, tlv},
};

pub type SignerId = String;

pub trait CommandValidator: Send + Sync {
    fn authorize(&self, interest: &Interest) -> Result<SignerId, AuthError>;
}

/// Accepts every command interest; documents that real verification lives
/// outside this crate.
pub struct AcceptAllValidator;

impl CommandValidator for AcceptAllValidator {
    fn authorize(&self, _interest: &Interest) -> Result<SignerId, AuthError> {
        Ok("anonymous".to_string())
    }
}

/// Accepts a command only if its name's first component matches one of a
/// fixed allow-list of signer tags — a stand-in for real signature
/// verification, useful for local testing and the demo tools.
pub struct AllowListValidator {
    pub allowed: Vec<String>,
}

impl CommandValidator for AllowListValidator {
    fn authorize(&self, interest: &Interest) -> Result<SignerId, AuthError> {
        let Some(first) = interest.name.0.first() else {
            return Err(AuthError::SignatureRejected);
        };
        let tag = String::from_utf8_lossy(&first.0).to_string();
        if self.allowed.contains(&tag) {
            Ok(tag)
        } else {
            Err(AuthError::NotAllowed)
        }
    }
}

pub struct CommandFrontend<E: crate::storage::StorageEngine> {
    pub validator: Arc<dyn CommandValidator>,
    pub face: Arc<dyn Face>,
    pub repo: write::SharedRepo<E>,
    pub inserts: write::SharedInsertTable,
    pub watches: watch::SharedWatchTable,
}

pub enum CommandKind {
    Insert,
    InsertCheck,
    Delete,
    WatchStart,
    WatchCheck,
    WatchStop,
}

impl<E: crate::storage::StorageEngine + 'static> CommandFrontend<E> {
    /// Decodes and authorizes an incoming command interest, then dispatches
    /// it to the matching handler. `param` is decoded by the caller from
    /// the name component immediately following the command prefix.
    pub async fn dispatch(
        &self,
        kind: CommandKind,
        interest: &Interest,
        param: RepoCommandParameter,
    ) -> RepoCommandResponse {
        if let Err(e) = self.validator.authorize(interest) {
            warn!(error = ?e, "command interest failed authorization");
            return RepoCommandResponse::with_status(StatusCode::Unauthorized);
        }

        match kind {
            CommandKind::Insert => write::start_insert(
                self.inserts.clone(),
                self.repo.clone(),
                self.face.clone(),
                param,
            )
            .await
            .unwrap_or_else(|_| RepoCommandResponse::with_status(StatusCode::BadArguments)),
            CommandKind::InsertCheck => write::check_insert(&self.inserts, &param)
                .await
                .unwrap_or_else(|e| error_response(&e)),
            CommandKind::Delete => {
                let mut guard = self.repo.lock().await;
                delete::handle_delete(&mut guard, &param)
            },
            CommandKind::WatchStart => watch::start_watch(
                self.watches.clone(),
                self.repo.clone(),
                self.face.clone(),
                param,
            )
            .await
            .unwrap_or_else(|_| RepoCommandResponse::with_status(StatusCode::BadArguments)),
            CommandKind::WatchCheck => watch::check_watch(&self.watches, &param)
                .await
                .unwrap_or_else(|e| error_response(&e)),
            CommandKind::WatchStop => watch::stop_watch(&self.watches, &param)
                .await
                .unwrap_or_else(|e| error_response(&e)),
        }
    }
}

/// Recognizes a command interest under one of the configured command
/// prefixes and pulls its `RepoCommandParameter` out of the name component
/// immediately following the verb: `<prefix>/insert/<param>`,
/// `<prefix>/insert check/<param>` (the verb is a single component holding
/// the literal bytes `"insert check"`, not two slash-separated components —
/// the real wire protocol never splits it), `<prefix>/delete/<param>`,
/// `<prefix>/watch/start/<param>`, `<prefix>/watch/check/<param>`,
/// `<prefix>/watch/stop/<param>`.
pub fn parse_command(
    interest: &Interest,
    command_prefixes: &[Name],
) -> Option<(CommandKind, RepoCommandParameter)> {
    let prefix = command_prefixes.iter().find(|p| p.is_prefix_of(&interest.name))?;
    let suffix = &interest.name.0[prefix.len()..];

    let verb = |c: &crate::wire::Component| String::from_utf8_lossy(&c.0).to_string();
    let param_at = |idx: usize| -> Option<RepoCommandParameter> {
        let component = suffix.get(idx)?;
        let mut cursor = component.0.clone();
        let el = tlv::Element::decode(&mut cursor).ok()?;
        RepoCommandParameter::decode(&el).ok()
    };

    match suffix.first().map(verb).as_deref() {
        Some("insert check") => Some((CommandKind::InsertCheck, param_at(1)?)),
        Some("insert") => Some((CommandKind::Insert, param_at(1)?)),
        Some("delete") => Some((CommandKind::Delete, param_at(1)?)),
        Some("watch") => match suffix.get(1).map(verb).as_deref() {
            Some("start") => Some((CommandKind::WatchStart, param_at(2)?)),
            Some("check") => Some((CommandKind::WatchCheck, param_at(2)?)),
            Some("stop") => Some((CommandKind::WatchStop, param_at(2)?)),
            _ => None,
        },
        _ => None,
    }
}

fn error_response(e: &crate::error::CommandError) -> RepoCommandResponse {
    match e {
        crate::error::CommandError::UnknownProcess => {
            RepoCommandResponse::with_status(StatusCode::UnknownProcess)
        },
        crate::error::CommandError::SelectorsConflictWithBlockIds => {
            RepoCommandResponse::with_status(StatusCode::MalformedParameters)
        },
        _ => RepoCommandResponse::with_status(StatusCode::BadArguments),
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        face::LoopbackFace,
        process::{InsertTable, WatchTable},
        repo::RepoStorage,
        storage::SqliteEngine,
        wire::Name,
    };

    fn frontend() -> CommandFrontend<SqliteEngine> {
        let engine = SqliteEngine::open_in_memory().expect("open");
        CommandFrontend {
            validator: Arc::new(AcceptAllValidator),
            face: Arc::new(LoopbackFace::new()),
            repo: Arc::new(Mutex::new(RepoStorage::new(engine, 100).expect("repo"))),
            inserts: Arc::new(Mutex::new(InsertTable::default())),
            watches: Arc::new(Mutex::new(WatchTable::default())),
        }
    }

    #[tokio::test]
    async fn unauthorized_interest_gets_401() {
        let mut fe = frontend();
        fe.validator = Arc::new(AllowListValidator { allowed: vec![] });
        let interest = Interest::new(Name::from_uri("/repo/insert"));
        let param = RepoCommandParameter { name: Some(Name::from_uri("/a")), ..Default::default() };
        let resp = fe.dispatch(CommandKind::Insert, &interest, param).await;
        assert_eq!(resp.status_code, Some(StatusCode::Unauthorized as u64));
    }

    #[tokio::test]
    async fn delete_dispatches_synchronously() {
        let fe = frontend();
        let interest = Interest::new(Name::from_uri("/repo/delete"));
        let param = RepoCommandParameter { name: Some(Name::from_uri("/none")), ..Default::default() };
        let resp = fe.dispatch(CommandKind::Delete, &interest, param).await;
        assert_eq!(resp.status_code, Some(StatusCode::Completed as u64));
        assert_eq!(resp.delete_num, Some(0));
    }

    fn interest_with_param(prefix: &str, verbs: &[&str], param: &RepoCommandParameter) -> Interest {
        let mut name = Name::from_uri(prefix);
        for v in verbs {
            name = name.append(crate::wire::name::Component::from_str(v));
        }
        let el = param.encode();
        let mut buf = bytes::BytesMut::new();
        el.encode(&mut buf);
        name = name.append(crate::wire::name::Component::from_bytes(buf.to_vec()));
        Interest::new(name)
    }

    #[test]
    fn parse_command_recognizes_insert_and_insert_check() {
        let prefixes = vec![Name::from_uri("/repo")];
        let param = RepoCommandParameter { name: Some(Name::from_uri("/a")), ..Default::default() };

        let interest = interest_with_param("/repo", &["insert"], &param);
        let (kind, decoded) = parse_command(&interest, &prefixes).expect("parsed");
        assert!(matches!(kind, CommandKind::Insert));
        assert_eq!(decoded, param);

        let interest = interest_with_param("/repo", &["insert check"], &param);
        let (kind, _) = parse_command(&interest, &prefixes).expect("parsed");
        assert!(matches!(kind, CommandKind::InsertCheck));
    }

    #[test]
    fn parse_command_recognizes_watch_verbs() {
        let prefixes = vec![Name::from_uri("/repo")];
        let param = RepoCommandParameter::default();

        let interest = interest_with_param("/repo", &["watch", "start"], &param);
        let (kind, _) = parse_command(&interest, &prefixes).expect("parsed");
        assert!(matches!(kind, CommandKind::WatchStart));

        let interest = interest_with_param("/repo", &["watch", "stop"], &param);
        let (kind, _) = parse_command(&interest, &prefixes).expect("parsed");
        assert!(matches!(kind, CommandKind::WatchStop));
    }

    #[test]
    fn parse_command_rejects_unknown_prefix() {
        let prefixes = vec![Name::from_uri("/repo")];
        let param = RepoCommandParameter::default();
        let interest = interest_with_param("/other", &["insert"], &param);
        assert!(parse_command(&interest, &prefixes).is_none());
    }
}
