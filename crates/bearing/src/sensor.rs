//! Heading sensor capability.
//!
//! A sensor reports device headings in degrees (0 = magnetic north, clockwise)
//! to any number of subscribers. Every subscriber holds its own
//! [`Subscription`]; dropping or cancelling it removes exactly that listener,
//! so several compasses can share one event source without cross-talk.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SensorSupport {
    /// Readings require an explicit permission request first.
    Gated,
    /// Readings are available without asking.
    Open,
    /// No heading hardware; the host must fall back to manual rotation.
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PermissionResponse {
    Granted,
    Denied,
}

pub type PermissionFuture = Pin<Box<dyn Future<Output = PermissionResponse>>>;
pub type HeadingCallback = Box<dyn FnMut(f64)>;

pub trait HeadingSensor {
    fn support(&self) -> SensorSupport;

    /// One-shot permission prompt. Only meaningful for [`SensorSupport::Gated`].
    fn request_permission(&self) -> PermissionFuture;

    fn subscribe(&self, callback: HeadingCallback) -> Subscription;
}

/// Handle to one registered listener. Unsubscribes when cancelled or dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing behind it (sensor without readings).
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn is_detached(&self) -> bool {
        self.cancel.is_none()
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, HeadingCallback)>,
    // ids cancelled while their callback was detached for a publish
    cancelled: HashSet<u64>,
}

impl Listeners {
    fn remove(&mut self, id: u64) {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        if self.entries.len() == before {
            self.cancelled.insert(id);
        }
    }
}

/// Shared in-process heading event source.
///
/// Cloning yields another handle to the same listener list, so a host can
/// keep one clone for publishing and hand another to controllers.
#[derive(Clone)]
pub struct HeadingFeed {
    listeners: Rc<RefCell<Listeners>>,
    support: SensorSupport,
    permission: PermissionResponse,
}

impl HeadingFeed {
    /// Feed that needs no permission.
    pub fn open() -> Self {
        Self {
            listeners: Rc::default(),
            support: SensorSupport::Open,
            permission: PermissionResponse::Granted,
        }
    }

    /// Feed behind a permission prompt that answers `response`.
    pub fn gated(response: PermissionResponse) -> Self {
        Self {
            listeners: Rc::default(),
            support: SensorSupport::Gated,
            permission: response,
        }
    }

    /// Delivers `heading` to every listener and returns how many were notified.
    pub fn publish(&self, heading: f64) -> usize {
        if !heading.is_finite() {
            log::debug!("Dropping non-finite heading sample: {}", heading);
            return 0;
        }

        // listeners may subscribe or unsubscribe from inside their callback
        let mut entries = std::mem::take(&mut self.listeners.borrow_mut().entries);
        for (_, callback) in entries.iter_mut() {
            callback(heading);
        }
        let notified = entries.len();

        let mut listeners = self.listeners.borrow_mut();
        let cancelled = std::mem::take(&mut listeners.cancelled);
        entries.retain(|(id, _)| !cancelled.contains(id));
        entries.append(&mut listeners.entries);
        listeners.entries = entries;

        notified
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

impl Default for HeadingFeed {
    fn default() -> Self {
        Self::open()
    }
}

impl HeadingSensor for HeadingFeed {
    fn support(&self) -> SensorSupport {
        self.support
    }

    fn request_permission(&self) -> PermissionFuture {
        let response = match self.support {
            SensorSupport::Gated => self.permission,
            SensorSupport::Open => PermissionResponse::Granted,
            SensorSupport::Absent => PermissionResponse::Denied,
        };
        Box::pin(future::ready(response))
    }

    fn subscribe(&self, callback: HeadingCallback) -> Subscription {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, callback));
            id
        };
        log::debug!("Heading listener {} subscribed", id);

        let weak: Weak<RefCell<Listeners>> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.borrow_mut().remove(id);
                log::debug!("Heading listener {} unsubscribed", id);
            }
        })
    }
}

/// Environment without any heading hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualOnly;

impl HeadingSensor for ManualOnly {
    fn support(&self) -> SensorSupport {
        SensorSupport::Absent
    }

    fn request_permission(&self) -> PermissionFuture {
        Box::pin(future::ready(PermissionResponse::Denied))
    }

    fn subscribe(&self, _callback: HeadingCallback) -> Subscription {
        Subscription::detached()
    }
}

/// Deterministic sensor that replays a fixed list of samples on demand.
pub struct ScriptedSensor {
    feed: HeadingFeed,
    samples: RefCell<VecDeque<f64>>,
}

impl ScriptedSensor {
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self::with_feed(HeadingFeed::open(), samples)
    }

    pub fn gated(response: PermissionResponse, samples: impl IntoIterator<Item = f64>) -> Self {
        Self::with_feed(HeadingFeed::gated(response), samples)
    }

    fn with_feed(feed: HeadingFeed, samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            feed,
            samples: RefCell::new(samples.into_iter().collect()),
        }
    }

    /// Publishes the next queued sample, if any.
    pub fn emit_next(&self) -> Option<f64> {
        let sample = self.samples.borrow_mut().pop_front()?;
        self.feed.publish(sample);
        Some(sample)
    }

    pub fn push(&self, sample: f64) {
        self.samples.borrow_mut().push_back(sample);
    }

    pub fn remaining(&self) -> usize {
        self.samples.borrow().len()
    }

    pub fn feed(&self) -> &HeadingFeed {
        &self.feed
    }
}

impl HeadingSensor for ScriptedSensor {
    fn support(&self) -> SensorSupport {
        self.feed.support()
    }

    fn request_permission(&self) -> PermissionFuture {
        self.feed.request_permission()
    }

    fn subscribe(&self, callback: HeadingCallback) -> Subscription {
        self.feed.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<f64>>>, HeadingCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |h| sink.borrow_mut().push(h)))
    }

    #[test]
    fn test_each_subscription_is_independent() {
        let feed = HeadingFeed::open();
        let (a_seen, a_cb) = recorder();
        let (b_seen, b_cb) = recorder();
        let a = feed.subscribe(a_cb);
        let _b = feed.subscribe(b_cb);

        assert_eq!(feed.publish(10.0), 2);
        a.unsubscribe();
        assert_eq!(feed.publish(20.0), 1);

        assert_eq!(*a_seen.borrow(), vec![10.0]);
        assert_eq!(*b_seen.borrow(), vec![10.0, 20.0]);
        assert_eq!(feed.listener_count(), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let feed = HeadingFeed::open();
        let (_seen, cb) = recorder();
        {
            let _sub = feed.subscribe(cb);
            assert_eq!(feed.listener_count(), 1);
        }
        assert_eq!(feed.listener_count(), 0);
        assert_eq!(feed.publish(1.0), 0);
    }

    #[test]
    fn test_unsubscribe_from_inside_callback() {
        let feed = HeadingFeed::open();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let calls = Rc::new(Cell::new(0));

        let (slot_cb, calls_cb) = (slot.clone(), calls.clone());
        let sub = feed.subscribe(Box::new(move |_| {
            calls_cb.set(calls_cb.get() + 1);
            slot_cb.borrow_mut().take();
        }));
        *slot.borrow_mut() = Some(sub);

        feed.publish(5.0);
        feed.publish(6.0);
        assert_eq!(calls.get(), 1);
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn test_non_finite_samples_are_dropped() {
        let feed = HeadingFeed::open();
        let (seen, cb) = recorder();
        let _sub = feed.subscribe(cb);
        assert_eq!(feed.publish(f64::NAN), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_manual_only_has_no_readings() {
        let sensor = ManualOnly;
        assert_eq!(sensor.support(), SensorSupport::Absent);
        let (_seen, cb) = recorder();
        assert!(sensor.subscribe(cb).is_detached());
    }

    #[tokio::test]
    async fn test_permission_responses() {
        assert_eq!(
            HeadingFeed::gated(PermissionResponse::Denied)
                .request_permission()
                .await,
            PermissionResponse::Denied
        );
        assert_eq!(
            HeadingFeed::open().request_permission().await,
            PermissionResponse::Granted
        );
        assert_eq!(
            ManualOnly.request_permission().await,
            PermissionResponse::Denied
        );
    }

    #[test]
    fn test_scripted_sensor_replays_in_order() {
        let sensor = ScriptedSensor::new([1.0, 2.0]);
        let (seen, cb) = recorder();
        let _sub = sensor.subscribe(cb);

        assert_eq!(sensor.emit_next(), Some(1.0));
        sensor.push(3.0);
        assert_eq!(sensor.remaining(), 2);
        while sensor.emit_next().is_some() {}
        assert_eq!(*seen.borrow(), vec![1.0, 2.0, 3.0]);
    }
}
