use tokio::select;
use tokio_util::sync::CancellationToken;

/// Turns Ctrl-C into a cancellation, and finishes once anything else
/// (such as the event feed reaching EOF) cancels the token first.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => (),
    };
}
