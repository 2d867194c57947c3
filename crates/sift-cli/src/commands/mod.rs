pub mod archive;
pub mod briefs;
pub mod cache;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod run;
pub mod select;

use tokio_util::sync::CancellationToken;

/// A token cancelled by the first Ctrl-C.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing with completed entries");
            trigger.cancel();
        }
    });
    token
}
