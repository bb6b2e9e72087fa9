//! Process-variable-style signals.
//!
//! A [`Signal`] is one named, observable value on a device: a cached
//! readback fanned out over a watch channel, plus optional transport hooks
//! for live hardware. Signals start disconnected; [`Signal::connect`]
//! selects mock mode (reads and writes stay in-process) or live mode
//! (writes and reads go through the wired hooks before the readback
//! updates). Mock mode additionally allows [`Signal::set_mock_value`],
//! which overwrites the readback directly and ignores the read-only flag,
//! so tests and simulations can stand in for the hardware side of
//! read-only fields.
//!
//! Waits on a signal ([`Signal::wait_for_value`], [`Signal::set_and_wait`])
//! are bounded by [`DEFAULT_TIMEOUT`] unless the caller supplies a bound.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::{AppResult, DetectorError};

/// Default bound for signal waits.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection state of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    /// No mode selected yet; reads and writes fail.
    Disconnected,
    /// In-process readback only; writes skip transport hooks.
    Mock,
    /// Writes and reads go through the wired transport hooks.
    Live,
}

/// Transport write hook: pushes a value to the hardware.
pub type WriteHook<T> = Arc<dyn Fn(T) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

/// Transport read hook: fetches the current value from the hardware.
pub type ReadHook<T> = Arc<dyn Fn() -> BoxFuture<'static, AppResult<T>> + Send + Sync>;

struct SignalShared<T> {
    pv: String,
    read_only: bool,
    mode: SignalMode,
    write_hook: Option<WriteHook<T>>,
    read_hook: Option<ReadHook<T>>,
}

/// A named, observable process variable with optional live transport.
pub struct Signal<T: Clone + fmt::Debug + Send + Sync + 'static> {
    sender: watch::Sender<T>,
    shared: Arc<RwLock<SignalShared<T>>>,
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Signal<T> {
    /// Creates a writable signal with the given process-variable name.
    pub fn new(pv: impl Into<String>, initial: T) -> Self {
        Self::build(pv.into(), initial, false)
    }

    /// Creates a read-only signal (a readback the hardware owns).
    ///
    /// Writes through [`Signal::set`] are rejected; mock connections can
    /// still drive the value with [`Signal::set_mock_value`].
    pub fn new_read_only(pv: impl Into<String>, initial: T) -> Self {
        Self::build(pv.into(), initial, true)
    }

    fn build(pv: String, initial: T, read_only: bool) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender,
            shared: Arc::new(RwLock::new(SignalShared {
                pv,
                read_only,
                mode: SignalMode::Disconnected,
                write_hook: None,
                read_hook: None,
            })),
        }
    }

    /// Wires the hook a live connection uses to push writes to hardware.
    pub fn connect_to_hardware_write<F>(&mut self, hook: F)
    where
        F: Fn(T) -> BoxFuture<'static, AppResult<()>> + Send + Sync + 'static,
    {
        self.shared.write().write_hook = Some(Arc::new(hook));
    }

    /// Wires the hook a live connection uses to fetch reads from hardware.
    pub fn connect_to_hardware_read<F>(&mut self, hook: F)
    where
        F: Fn() -> BoxFuture<'static, AppResult<T>> + Send + Sync + 'static,
    {
        self.shared.write().read_hook = Some(Arc::new(hook));
    }

    /// Selects mock or live mode.
    ///
    /// Live mode requires at least one transport hook; selecting it on an
    /// unwired signal fails with [`DetectorError::TransportMissing`].
    pub fn connect(&self, mock: bool) -> AppResult<()> {
        let mut shared = self.shared.write();
        if mock {
            shared.mode = SignalMode::Mock;
        } else {
            if shared.write_hook.is_none() && shared.read_hook.is_none() {
                return Err(DetectorError::TransportMissing { pv: shared.pv.clone() });
            }
            shared.mode = SignalMode::Live;
        }
        tracing::debug!(pv = %shared.pv, mode = ?shared.mode, "signal connected");
        Ok(())
    }

    /// Process-variable name.
    pub fn pv(&self) -> String {
        self.shared.read().pv.clone()
    }

    /// Current connection mode.
    pub fn mode(&self) -> SignalMode {
        self.shared.read().mode
    }

    /// Source identifier for descriptors, e.g. `ca://CAM:Acquire`,
    /// prefixed with `mock+` while mock-connected.
    pub fn source(&self) -> String {
        let shared = self.shared.read();
        match shared.mode {
            SignalMode::Mock => format!("mock+ca://{}", shared.pv),
            _ => format!("ca://{}", shared.pv),
        }
    }

    /// Reads the current value.
    ///
    /// Live connections with a read hook fetch from hardware and refresh
    /// the readback; mock connections return the cached readback.
    pub async fn get_value(&self) -> AppResult<T> {
        let (mode, pv, hook) = {
            let shared = self.shared.read();
            (shared.mode, shared.pv.clone(), shared.read_hook.clone())
        };
        match mode {
            SignalMode::Disconnected => Err(DetectorError::SignalNotConnected { pv }),
            SignalMode::Mock => Ok(self.sender.borrow().clone()),
            SignalMode::Live => {
                if let Some(hook) = hook {
                    let value = hook().await?;
                    self.sender.send_replace(value.clone());
                    Ok(value)
                } else {
                    Ok(self.sender.borrow().clone())
                }
            }
        }
    }

    /// Writes a value.
    ///
    /// Rejects read-only signals. Live connections push through the write
    /// hook first; the readback updates and subscribers are notified only
    /// after the hook succeeds.
    pub async fn set(&self, value: T) -> AppResult<()> {
        let (mode, pv, read_only, hook) = {
            let shared = self.shared.read();
            (shared.mode, shared.pv.clone(), shared.read_only, shared.write_hook.clone())
        };
        if mode == SignalMode::Disconnected {
            return Err(DetectorError::SignalNotConnected { pv });
        }
        if read_only {
            return Err(DetectorError::SignalReadOnly { pv });
        }
        if mode == SignalMode::Live {
            if let Some(hook) = hook {
                hook(value.clone()).await?;
            }
        }
        tracing::trace!(pv = %pv, value = ?value, "signal set");
        self.sender.send_replace(value);
        Ok(())
    }

    /// Overwrites the readback directly, standing in for the hardware.
    ///
    /// Only valid on mock connections; bypasses the read-only flag and
    /// transport hooks.
    pub fn set_mock_value(&self, value: T) -> AppResult<()> {
        let (mode, pv) = {
            let shared = self.shared.read();
            (shared.mode, shared.pv.clone())
        };
        if mode != SignalMode::Mock {
            return Err(DetectorError::MockOverrideOnLiveSignal { pv });
        }
        tracing::trace!(pv = %pv, value = ?value, "mock override");
        self.sender.send_replace(value);
        Ok(())
    }

    /// Subscribes to readback changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Waits until the readback satisfies `predicate`, bounded by
    /// `timeout` (or [`DEFAULT_TIMEOUT`]).
    pub async fn wait_for_value<F>(&self, predicate: F, timeout: Option<Duration>) -> AppResult<()>
    where
        F: Fn(&T) -> bool + Send,
    {
        let bound = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut receiver = self.subscribe();
        if predicate(&receiver.borrow()) {
            return Ok(());
        }
        let matched = tokio::time::timeout(bound, async {
            while receiver.changed().await.is_ok() {
                if predicate(&receiver.borrow()) {
                    return true;
                }
            }
            false
        })
        .await;
        match matched {
            Ok(true) => Ok(()),
            _ => Err(DetectorError::WaitTimeout {
                pv: self.pv(),
                seconds: bound.as_secs_f64(),
            }),
        }
    }

    /// Writes a value and waits for the readback to confirm it.
    pub async fn set_and_wait(&self, value: T, timeout: Option<Duration>) -> AppResult<()>
    where
        T: PartialEq,
    {
        self.set(value.clone()).await?;
        self.wait_for_value(|current| *current == value, timeout).await
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.read();
        f.debug_struct("Signal")
            .field("pv", &shared.pv)
            .field("mode", &shared.mode)
            .field("value", &*self.sender.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn operations_require_a_connection() {
        let signal = Signal::new("CAM:Acquire", false);
        assert!(matches!(
            signal.get_value().await,
            Err(DetectorError::SignalNotConnected { .. })
        ));
        assert!(matches!(
            signal.set(true).await,
            Err(DetectorError::SignalNotConnected { .. })
        ));
    }

    #[tokio::test]
    async fn mock_set_updates_readback() {
        let signal = Signal::new("CAM:AcquireTime", 0.0_f64);
        signal.connect(true).unwrap();
        signal.set(0.5).await.unwrap();
        assert!((signal.get_value().await.unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn read_only_rejects_set_but_allows_mock_override() {
        let signal = Signal::new_read_only("HDF1:FullFileName_RBV", String::new());
        signal.connect(true).unwrap();
        assert!(matches!(
            signal.set("x".to_string()).await,
            Err(DetectorError::SignalReadOnly { .. })
        ));
        signal.set_mock_value("/data/foo.h5".to_string()).unwrap();
        assert_eq!(signal.get_value().await.unwrap(), "/data/foo.h5");
    }

    #[test]
    fn mock_override_requires_mock_mode() {
        let signal = Signal::new("CAM:Gain", 1.0_f64);
        assert!(matches!(
            signal.set_mock_value(2.0),
            Err(DetectorError::MockOverrideOnLiveSignal { .. })
        ));
    }

    #[test]
    fn source_reflects_mode() {
        let signal = Signal::new("GIGE:HDF1:FullFileName_RBV", String::new());
        assert_eq!(signal.source(), "ca://GIGE:HDF1:FullFileName_RBV");
        signal.connect(true).unwrap();
        assert_eq!(signal.source(), "mock+ca://GIGE:HDF1:FullFileName_RBV");
    }

    #[test]
    fn live_mode_requires_a_hook() {
        let signal = Signal::new("CAM:Acquire", false);
        assert!(matches!(
            signal.connect(false),
            Err(DetectorError::TransportMissing { .. })
        ));
    }

    #[tokio::test]
    async fn live_write_goes_through_hook_before_readback() {
        let writes = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&writes);
        let mut signal = Signal::new("CAM:NumImages", 0_i64);
        signal.connect_to_hardware_write(move |value| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                assert_eq!(value, 7);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        signal.connect(false).unwrap();
        signal.set(7).await.unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(signal.get_value().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn live_read_fetches_through_hook() {
        let mut signal = Signal::new("CAM:Temperature", 0.0_f64);
        signal.connect_to_hardware_read(|| Box::pin(async { Ok(42.0) }));
        signal.connect(false).unwrap();
        assert!((signal.get_value().await.unwrap() - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn wait_for_value_sees_later_writes() {
        let signal = Signal::new("CAM:Acquire", false);
        signal.connect(true).unwrap();
        let waiter = signal.clone();
        let task = tokio::spawn(async move {
            waiter.wait_for_value(|armed| *armed, Some(Duration::from_secs(1))).await
        });
        tokio::task::yield_now().await;
        signal.set(true).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn wait_for_value_times_out() {
        let signal = Signal::new("CAM:Acquire", false);
        signal.connect(true).unwrap();
        let result = signal
            .wait_for_value(|armed| *armed, Some(Duration::from_millis(20)))
            .await;
        assert!(matches!(result, Err(DetectorError::WaitTimeout { .. })));
    }

    #[tokio::test]
    async fn set_and_wait_confirms_in_mock_mode() {
        let signal = Signal::new("HDF1:Capture", false);
        signal.connect(true).unwrap();
        signal.set_and_wait(true, Some(Duration::from_secs(1))).await.unwrap();
        assert!(signal.get_value().await.unwrap());
    }
}
