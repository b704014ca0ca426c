use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tally_core::db::SyncHistoryRepository;
use tally_core::models::SyncPeerStatus;
use tally_core::sync::{decode_payload, encode_payload, should_initiate, Received, SyncSession};
use tally_core::PeerId;

use crate::commands::common::{
    format_relative_time, format_sync_timestamp, open_database, write_output, AppContext,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncPeerItem {
    pub peer: String,
    pub last_synced_at: String,
    pub relative_time: String,
    pub snapshot_len: usize,
}

pub fn sync_peer_to_item(status: &SyncPeerStatus) -> SyncPeerItem {
    SyncPeerItem {
        peer: status.peer.to_string(),
        last_synced_at: status.last_synced_at.to_rfc3339(),
        relative_time: format_relative_time(status.last_synced_at, Utc::now()),
        snapshot_len: status.snapshot_len,
    }
}

pub fn format_sync_peer_lines(peers: &[SyncPeerStatus]) -> Vec<String> {
    let now = Utc::now();
    peers
        .iter()
        .map(|status| {
            format!(
                "{}  {} ({})  {} tracked",
                status.peer,
                format_sync_timestamp(status.last_synced_at),
                format_relative_time(status.last_synced_at, now),
                status.snapshot_len
            )
        })
        .collect()
}

fn local_session(ctx: &AppContext) -> Result<SyncSession, CliError> {
    let peer = ctx
        .config
        .peer_id()
        .map_err(CliError::Config)?
        .ok_or(CliError::DeviceNotConfigured)?;
    Ok(SyncSession::new(peer))
}

pub fn run_sync_offer(output_path: Option<&Path>, ctx: &AppContext) -> Result<(), CliError> {
    let session = local_session(ctx)?;
    let db = open_database(&ctx.db_path)?;
    let payload = session.offer(&db)?;

    write_output(output_path, &encode_payload(&payload)?)?;
    eprintln!(
        "Offered {} transactions as {}",
        payload.transactions.len(),
        session.local_peer()
    );
    Ok(())
}

pub fn run_sync_receive(
    payload_path: &Path,
    output_path: Option<&Path>,
    ctx: &AppContext,
) -> Result<Received, CliError> {
    let session = local_session(ctx)?;
    let payload = decode_payload(&std::fs::read(payload_path)?)?;
    let sender = payload.sender.clone();

    let mut db = open_database(&ctx.db_path)?;
    let received = session.receive(&mut db, payload, Utc::now())?;

    match &received {
        Received::Merged { reply, report } => {
            write_output(output_path, &encode_payload(reply)?)?;
            eprintln!(
                "Merged with {sender}: {} transactions, {} conflicts, {} added, {} removed",
                reply.transactions.len(),
                report.conflicts,
                report.added_from_local + report.added_from_remote,
                report.deleted_locally + report.deleted_remotely
            );
        }
        Received::Adopted { ledger_len } => {
            eprintln!("Adopted {ledger_len} transactions from {sender}");
        }
    }

    Ok(received)
}

pub fn run_sync_role(peer: &str, ctx: &AppContext) -> Result<bool, CliError> {
    let session = local_session(ctx)?;
    let remote = PeerId::new(peer)?;
    let initiates = should_initiate(session.local_peer(), &remote);

    if initiates {
        println!("initiator: run `tally sync offer` and send the payload to {remote}");
    } else {
        println!("responder: wait for {remote} to send its offer, then run `tally sync receive`");
    }
    Ok(initiates)
}

pub fn run_sync_status(as_json: bool, ctx: &AppContext) -> Result<(), CliError> {
    let db = open_database(&ctx.db_path)?;
    let peers = db.sync_history().peers()?;

    if as_json {
        let json_items = peers
            .iter()
            .map(sync_peer_to_item)
            .collect::<Vec<SyncPeerItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if peers.is_empty() {
        println!("No sync rounds recorded.");
        return Ok(());
    }

    for line in format_sync_peer_lines(&peers) {
        println!("{line}");
    }
    Ok(())
}
