use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber for adapter registration and decode
/// diagnostics, writing to stdout. `debug` also shows `[REGISTER]` lines and
/// decoded payloads; otherwise only decode failures and above are shown.
///
/// Safe to call more than once: only the first call installs a subscriber.
pub fn init(debug: bool) {
    let _ = subscriber(debug, std::io::stdout).try_init();
}

/// The subscriber [`init`] installs, writing to `writer` instead.
pub fn subscriber<W>(debug: bool, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::SystemTime)
        .with_level(true)
        .with_target(true)
        .with_writer(writer)
        .finish()
}

/// Runs `f` under a scoped subscriber and returns everything it logged.
#[cfg(test)]
pub(crate) fn captured<F: FnOnce()>(debug: bool, f: F) -> String {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buffer = Buffer::default();
    let writer = buffer.clone();
    tracing::subscriber::with_default(subscriber(debug, move || writer.clone()), f);

    let bytes = buffer.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
