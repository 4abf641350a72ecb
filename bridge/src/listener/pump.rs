//! Dedicated-thread driver for a [`Listener`]
//!
//! For hosts without a frame loop of their own: a background thread calls
//! `tick` with a short sleep between iterations.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use super::Listener;

pub struct PumpHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Listener>>,
}

/// Move `listener` onto a thread that ticks it every `interval`
pub fn spawn(mut listener: Listener, interval: Duration) -> io::Result<PumpHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let thread = thread::Builder::new()
        .name("bridge-pump".to_string())
        .spawn(move || {
            debug!(?interval, "Pump started");
            while !flag.load(Ordering::Acquire) {
                let stats = listener.tick();
                // Busy ticks go straight into the next one
                if stats.is_idle() {
                    thread::sleep(interval);
                }
            }
            listener.stop();
            listener
        })?;

    Ok(PumpHandle {
        stop,
        thread: Some(thread),
    })
}

impl PumpHandle {
    /// Stop the thread and hand back the (stopped) listener
    ///
    /// `None` if the pump thread panicked.
    pub fn shutdown(mut self) -> Option<Listener> {
        self.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn join(&mut self) -> Option<Listener> {
        self.stop.store(true, Ordering::Release);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(listener) => Some(listener),
            Err(_) => {
                error!("Pump thread panicked");
                None
            }
        }
    }
}

impl Drop for PumpHandle {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{ListenerConfig, ListenerState};
    use crate::registry::CommandRegistry;

    #[test]
    fn test_shutdown_returns_stopped_listener() {
        let mut listener = Listener::new(CommandRegistry::new(), ListenerConfig::default());
        let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();

        let pump = spawn(listener, Duration::from_millis(1)).unwrap();
        assert!(!pump.is_finished());
        let listener = pump.shutdown().unwrap();

        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(listener.local_addr(), Some(addr));
    }

    #[test]
    fn test_restart_on_same_port_after_shutdown() {
        let mut listener = Listener::new(CommandRegistry::new(), ListenerConfig::default());
        let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut listener = spawn(listener, Duration::from_millis(1))
            .unwrap()
            .shutdown()
            .unwrap();

        assert_eq!(listener.start(addr).unwrap(), addr);
    }
}
