use crate::events::AppEvent;
use async_channel::Sender;
use bearing::SOCKET_PATH;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;

/// What the background thread runs next to the GTK main loop.
#[derive(Debug, Clone)]
pub struct BackgroundServices {
    pub socket_path: PathBuf,
    pub watch_config: bool,
}

impl Default for BackgroundServices {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(SOCKET_PATH),
            watch_config: true,
        }
    }
}

impl BackgroundServices {
    /// Starts the socket server, and the config watcher when enabled, on a
    /// dedicated tokio thread. Events land in `tx`.
    pub fn start(self, tx: Sender<AppEvent>) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("luopan-services".into())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("Failed to create Tokio runtime: {}", e);
                        return;
                    }
                };

                rt.block_on(async move {
                    if self.watch_config {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            crate::config::run_async_watcher(tx).await;
                        });
                    }
                    crate::sys::server::run_server_at(&self.socket_path, tx).await;
                });
            })
    }
}

pub fn start_background_services(tx: Sender<AppEvent>) -> std::io::Result<JoinHandle<()>> {
    BackgroundServices::default().start(tx)
}
