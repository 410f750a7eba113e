use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The cancellation signal fired before the operation completed
#[derive(Debug)]
pub(crate) struct Cancelled;

/// Run `operation` on a background task and race it against `cancel`
///
/// Cancellation only expedites the return. The background task keeps running until the
/// operation finishes on its own and its output is dropped with the task; nothing forcibly
/// aborts it midway.
pub(crate) async fn run_cancellable<F>(
    cancel: &CancellationToken,
    operation: F,
) -> Result<F::Output, Cancelled>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }

    let mut task = tokio::spawn(operation);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        joined = &mut task => match joined {
            Ok(output) => Ok(output),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            // the runtime is shutting down
            Err(_) => Err(Cancelled),
        },
    }
}

/// A cancellation token that fires once a timeout elapses
///
/// Dereferences to the underlying [`CancellationToken`], so it can be passed wherever a token is
/// expected and cancelled early by hand. The timer only runs while the `Deadline` is alive:
/// dropping it stops the timer without cancelling the token.
#[derive(Debug)]
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// The token cancelled when the timeout elapses
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Deref for Deadline {
    type Target = CancellationToken;

    fn deref(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Create a [`Deadline`] that fires after `timeout`
///
/// Must be called from within a tokio runtime. Timeouts and explicit cancellation are the same
/// signal as far as the credentials are concerned.
pub fn deadline(timeout: Duration) -> Deadline {
    let token = CancellationToken::new();
    let fire = token.clone();
    let timer = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => fire.cancel(),
            _ = fire.cancelled() => {}
        }
    });
    Deadline { token, timer }
}
