use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use tokio::sync::mpsc::Sender;

/// What should we do when the user stops this program?
///
/// Tells systemd we are stopping and wakes up the main task through
/// `shutdown`.
pub fn handle_shutdown(shutdown: Sender<()>) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::warn!("Received signal {signal}, shutting down");
            let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]);
            let _ = shutdown.blocking_send(());
        }
    });

    Ok(())
}
