use crate::events::AppEvent;
use async_channel::Sender;
use bearing::Command;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

pub async fn run_server_at(path: &Path, tx: Sender<AppEvent>) {
    // Cleanup old socket if it exists
    if fs_err::metadata(path).is_ok() {
        let _ = fs_err::remove_file(path);
    }

    let listener = match UnixListener::bind(path) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket {}: {}", path.display(), e);
            return;
        }
    };
    log::info!("Listening on {}", path.display());

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    forward_lines(BufReader::new(&mut stream), &tx).await;
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Parses each line as a [`Command`] and forwards it. Returns how many
/// commands were sent.
pub async fn forward_lines<R>(reader: R, tx: &Sender<AppEvent>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut sent = 0;

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if tx.send(AppEvent::from(command)).await.is_err() {
                    break;
                }
                sent += 1;
            }
            Err(e) => log::warn!("Ignoring socket line {:?}: {}", line, e),
        }
    }
    sent
}
