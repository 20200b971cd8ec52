//! Orientation controller.
//!
//! Turns raw device headings into a target dial angle and eases the current
//! angle toward it once per frame along the shortest arc. The host drives
//! [`OrientationController::advance`] from its frame clock; nothing in here
//! owns a timer.

use crate::theme::Theme;
use bearing::{
    HeadingSensor, PermissionFuture, PermissionResponse, SensorSupport, Subscription, normalize,
    shortest_diff,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use strum::Display;
use thiserror::Error;

pub const DEFAULT_DAMPING: f64 = 0.12;
pub const DEFAULT_EPSILON: f64 = 0.1;
pub const DEFAULT_MANUAL_STEP: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Permission {
    #[default]
    Unknown,
    Requesting,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationState {
    pub permission: Permission,
    /// Degrees in `[0, 360)`.
    pub current_angle: f64,
    /// Degrees in `[0, 360)`.
    pub target_angle: f64,
    pub is_animating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("damping factor {0} must be in (0, 1]")]
    Damping(f64),
    #[error("epsilon {0} must be a positive number")]
    Epsilon(f64),
    #[error("manual step {0} must be a finite number")]
    ManualStep(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSettings {
    /// Share of the remaining gap closed per frame.
    pub damping_factor: f64,
    /// Gap below which the dial snaps onto the target.
    pub epsilon: f64,
    /// Calibration added to every converted heading.
    pub heading_offset: f64,
    /// Degrees per fixed-step manual rotation.
    pub manual_step: f64,
}

impl Default for OrientationSettings {
    fn default() -> Self {
        Self {
            damping_factor: DEFAULT_DAMPING,
            epsilon: DEFAULT_EPSILON,
            heading_offset: 0.0,
            manual_step: DEFAULT_MANUAL_STEP,
        }
    }
}

impl OrientationSettings {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            damping_factor: theme.animation.damping_factor,
            heading_offset: theme.heading_offset,
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<Self, SettingsError> {
        if !(self.damping_factor > 0.0 && self.damping_factor <= 1.0) {
            return Err(SettingsError::Damping(self.damping_factor));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(SettingsError::Epsilon(self.epsilon));
        }
        if !self.manual_step.is_finite() {
            return Err(SettingsError::ManualStep(self.manual_step));
        }
        Ok(self)
    }
}

/// State the sensor callback writes into.
#[derive(Debug)]
struct Shared {
    state: OrientationState,
    heading_offset: f64,
    epsilon: f64,
    last_heading: Option<f64>,
}

impl Shared {
    fn retarget(&mut self, target: f64) {
        self.state.target_angle = normalize(target);
        self.refresh_animating();
    }

    fn refresh_animating(&mut self) {
        let gap = shortest_diff(self.state.current_angle, self.state.target_angle);
        self.state.is_animating = gap.abs() >= self.epsilon;
    }

    fn apply_heading(&mut self, heading: f64) {
        self.last_heading = Some(heading);
        self.retarget(-heading + self.heading_offset);
    }
}

type AngleListener = Box<dyn FnMut(f64)>;

pub struct OrientationController {
    sensor: Rc<dyn HeadingSensor>,
    shared: Rc<RefCell<Shared>>,
    damping_factor: f64,
    manual_step: f64,
    subscription: Option<Subscription>,
    listeners: Vec<AngleListener>,
    disposed: bool,
}

impl OrientationController {
    pub fn new(
        sensor: Rc<dyn HeadingSensor>,
        settings: OrientationSettings,
    ) -> Result<Self, SettingsError> {
        let settings = settings.validate()?;
        Ok(Self {
            sensor,
            shared: Rc::new(RefCell::new(Shared {
                state: OrientationState::default(),
                heading_offset: settings.heading_offset,
                epsilon: settings.epsilon,
                last_heading: None,
            })),
            damping_factor: settings.damping_factor,
            manual_step: settings.manual_step,
            subscription: None,
            listeners: Vec::new(),
            disposed: false,
        })
    }

    pub fn state(&self) -> OrientationState {
        self.shared.borrow().state
    }

    pub fn permission(&self) -> Permission {
        self.shared.borrow().state.permission
    }

    pub fn current_angle(&self) -> f64 {
        self.shared.borrow().state.current_angle
    }

    pub fn target_angle(&self) -> f64 {
        self.shared.borrow().state.target_angle
    }

    pub fn is_animating(&self) -> bool {
        self.shared.borrow().state.is_animating
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn manual_step(&self) -> f64 {
        self.manual_step
    }

    /// First half of a permission request.
    ///
    /// Returns the platform prompt to await when the sensor is gated; pass its
    /// answer to [`Self::complete_permission_request`]. Open and absent
    /// sensors settle immediately and return `None`.
    pub fn begin_permission_request(&mut self) -> Option<PermissionFuture> {
        if self.disposed {
            log::warn!("Permission requested on a disposed orientation controller");
            return None;
        }
        match self.sensor.support() {
            SensorSupport::Gated => {
                self.set_permission(Permission::Requesting);
                Some(self.sensor.request_permission())
            }
            SensorSupport::Open => {
                self.grant();
                None
            }
            SensorSupport::Absent => {
                log::info!("No heading sensor, manual rotation only");
                self.deny();
                None
            }
        }
    }

    pub fn complete_permission_request(&mut self, response: PermissionResponse) {
        if self.disposed {
            log::debug!("Ignoring permission response after dispose");
            return;
        }
        match response {
            PermissionResponse::Granted => self.grant(),
            PermissionResponse::Denied => self.deny(),
        }
    }

    pub async fn request_permission(&mut self) -> Permission {
        if let Some(prompt) = self.begin_permission_request() {
            let response = prompt.await;
            self.complete_permission_request(response);
        }
        self.permission()
    }

    fn set_permission(&self, permission: Permission) {
        let mut shared = self.shared.borrow_mut();
        if shared.state.permission != permission {
            log::info!(
                "Sensor permission {} -> {}",
                shared.state.permission,
                permission
            );
        }
        shared.state.permission = permission;
    }

    fn grant(&mut self) {
        self.set_permission(Permission::Granted);
        if self.subscription.is_some() {
            return;
        }
        let weak: Weak<RefCell<Shared>> = Rc::downgrade(&self.shared);
        self.subscription = Some(self.sensor.subscribe(Box::new(move |heading| {
            if let Some(shared) = weak.upgrade() {
                shared.borrow_mut().apply_heading(heading);
            }
        })));
    }

    fn deny(&mut self) {
        self.set_permission(Permission::Denied);
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    /// Moves the target by `delta` degrees. The dial eases there on later
    /// frames.
    pub fn rotate_manually(&mut self, delta: f64) {
        if !delta.is_finite() {
            log::warn!("Ignoring non-finite manual rotation {}", delta);
            return;
        }
        let mut shared = self.shared.borrow_mut();
        let target = shared.state.target_angle + delta;
        shared.retarget(target);
    }

    pub fn rotate_step(&mut self, direction: RotateDirection) {
        let delta = match direction {
            RotateDirection::Clockwise => self.manual_step,
            RotateDirection::CounterClockwise => -self.manual_step,
        };
        self.rotate_manually(delta);
    }

    /// Changes the calibration offset (theme switch) and re-aims the target.
    pub fn set_heading_offset(&mut self, offset: f64) {
        if !offset.is_finite() {
            log::warn!("Ignoring non-finite heading offset {}", offset);
            return;
        }
        let mut shared = self.shared.borrow_mut();
        let previous = shared.heading_offset;
        shared.heading_offset = offset;
        match shared.last_heading {
            Some(heading) => shared.apply_heading(heading),
            None => {
                let target = shared.state.target_angle + offset - previous;
                shared.retarget(target);
            }
        }
    }

    pub fn set_damping_factor(&mut self, damping: f64) -> Result<(), SettingsError> {
        if !(damping > 0.0 && damping <= 1.0) {
            return Err(SettingsError::Damping(damping));
        }
        self.damping_factor = damping;
        Ok(())
    }

    /// One animation frame. Returns the new current angle.
    pub fn advance(&mut self) -> f64 {
        let moved = {
            let mut shared = self.shared.borrow_mut();
            let before = shared.state.current_angle;
            let target = shared.state.target_angle;
            let stepped = normalize(before + shortest_diff(before, target) * self.damping_factor);

            // land exactly once inside epsilon, the host stops ticking after this frame
            shared.state.current_angle = if shortest_diff(stepped, target).abs() < shared.epsilon {
                target
            } else {
                stepped
            };
            shared.refresh_animating();
            (shared.state.current_angle != before).then_some(shared.state.current_angle)
        };

        if let Some(angle) = moved {
            for listener in self.listeners.iter_mut() {
                listener(angle);
            }
        }
        self.current_angle()
    }

    /// Registers `callback` to run with the new current angle whenever a
    /// frame moves the dial.
    pub fn on_angle_change(&mut self, callback: impl FnMut(f64) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    /// Releases this controller's sensor subscription.
    pub fn dispose(&mut self) {
        if self.disposed {
            log::warn!("Orientation controller disposed twice");
            return;
        }
        self.disposed = true;
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
        self.listeners.clear();
        log::debug!("Orientation controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for OrientationController {
    fn drop(&mut self) {
        if !self.disposed {
            log::warn!("Orientation controller dropped without dispose()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bearing::{HeadingFeed, ManualOnly, ScriptedSensor};
    use std::cell::Cell;

    fn controller(sensor: Rc<dyn HeadingSensor>) -> OrientationController {
        OrientationController::new(sensor, OrientationSettings::default()).unwrap()
    }

    fn at(current: f64, target: f64) -> OrientationController {
        let mut c = controller(Rc::new(ManualOnly));
        {
            let mut shared = c.shared.borrow_mut();
            shared.state.current_angle = current;
            shared.retarget(target);
        }
        c.begin_permission_request();
        c
    }

    #[test]
    fn test_wraparound_takes_short_path() {
        let mut c = at(350.0, 10.0);
        let after = c.advance();
        // +20 * 0.12 forward through north
        assert!((after - 352.4).abs() < 1e-9, "{after}");
        c.dispose();

        let mut c = at(10.0, 350.0);
        assert!((c.advance() - 7.6).abs() < 1e-9);
        c.dispose();
    }

    #[test]
    fn test_step_never_overshoots() {
        let pairs = [(0.0, 179.0), (350.0, 10.0), (90.0, 270.5), (5.0, 355.0), (1.0, 1.05)];
        for (current, target) in pairs {
            let mut c = at(current, target);
            for _ in 0..200 {
                let before = shortest_diff(c.current_angle(), c.target_angle()).abs();
                c.advance();
                let after = shortest_diff(c.current_angle(), c.target_angle()).abs();
                if before >= DEFAULT_EPSILON {
                    assert!(after < before, "{current}->{target}: {before} -> {after}");
                } else {
                    assert_eq!(after, 0.0);
                }
            }
            c.dispose();
        }
    }

    #[test]
    fn test_converges_and_snaps_exactly() {
        // drive frames only while animating, as the frame clock does
        for (current, target) in [(0.0, 200.0), (350.0, 0.0), (120.0, 119.5), (10.0, 300.0)] {
            let mut c = at(current, target);
            assert!(c.is_animating());
            let mut frames = 0;
            while c.is_animating() {
                c.advance();
                frames += 1;
                assert!(frames < 500, "{current}->{target} did not converge");
            }
            assert_eq!(c.current_angle(), c.target_angle(), "{current}->{target}");
            c.dispose();
        }
    }

    #[test]
    fn test_retarget_mid_animation() {
        let mut c = at(0.0, 90.0);
        c.advance();
        c.rotate_manually(-180.0);
        assert!((c.target_angle() - 270.0).abs() < 1e-9);
        let before = c.current_angle();
        c.advance();
        // shortest way to 270 from ~10.8 is backward
        assert!(shortest_diff(before, c.current_angle()) < 0.0);
        c.dispose();
    }

    #[test]
    fn test_manual_rotation_and_steps() {
        let mut c = controller(Rc::new(ManualOnly));
        c.rotate_manually(-30.0);
        assert_eq!(c.target_angle(), 330.0);
        c.rotate_step(RotateDirection::Clockwise);
        assert_eq!(c.target_angle(), 60.0);
        c.rotate_step(RotateDirection::CounterClockwise);
        c.rotate_step(RotateDirection::CounterClockwise);
        assert_eq!(c.target_angle(), 240.0);
        c.rotate_manually(f64::NAN);
        assert_eq!(c.target_angle(), 240.0);
        assert_eq!(c.current_angle(), 0.0);
        c.dispose();
    }

    #[test]
    fn test_open_sensor_grants_and_retargets() {
        let feed = HeadingFeed::open();
        let mut c = controller(Rc::new(feed.clone()));
        assert!(c.begin_permission_request().is_none());
        assert_eq!(c.permission(), Permission::Granted);
        assert!(c.is_subscribed());

        feed.publish(90.0);
        assert_eq!(c.target_angle(), 270.0);
        assert_eq!(c.current_angle(), 0.0);
        assert!(c.is_animating());
        c.dispose();
    }

    #[test]
    fn test_absent_sensor_is_denied() {
        let mut c = controller(Rc::new(ManualOnly));
        assert!(c.begin_permission_request().is_none());
        assert_eq!(c.permission(), Permission::Denied);
        assert!(!c.is_subscribed());
        c.dispose();
    }

    #[tokio::test]
    async fn test_gated_permission_flow() {
        let sensor = Rc::new(ScriptedSensor::gated(PermissionResponse::Granted, [45.0]));
        let mut c = controller(sensor.clone());
        assert_eq!(c.permission(), Permission::Unknown);

        let prompt = c.begin_permission_request().unwrap();
        assert_eq!(c.permission(), Permission::Requesting);
        let response = prompt.await;
        c.complete_permission_request(response);
        assert_eq!(c.permission(), Permission::Granted);

        sensor.emit_next();
        assert_eq!(c.target_angle(), 315.0);
        c.dispose();

        let denied = Rc::new(HeadingFeed::gated(PermissionResponse::Denied));
        let mut c = controller(denied.clone());
        assert_eq!(c.request_permission().await, Permission::Denied);
        denied.publish(45.0);
        assert_eq!(c.target_angle(), 0.0);
        assert_eq!(denied.listener_count(), 0);
        c.dispose();
    }

    #[test]
    fn test_heading_offset_recalibrates() {
        let feed = HeadingFeed::open();
        let mut c = controller(Rc::new(feed.clone()));
        c.begin_permission_request();
        feed.publish(30.0);
        assert_eq!(c.target_angle(), 330.0);

        c.set_heading_offset(45.0);
        assert_eq!(c.target_angle(), 15.0);
        c.dispose();

        let mut manual = controller(Rc::new(ManualOnly));
        manual.rotate_manually(10.0);
        manual.set_heading_offset(-20.0);
        assert_eq!(manual.target_angle(), 350.0);
        manual.dispose();
    }

    #[test]
    fn test_controllers_dispose_independently() {
        let feed = HeadingFeed::open();
        let mut a = controller(Rc::new(feed.clone()));
        let mut b = controller(Rc::new(feed.clone()));
        a.begin_permission_request();
        b.begin_permission_request();
        assert_eq!(feed.listener_count(), 2);

        a.dispose();
        assert_eq!(feed.listener_count(), 1);
        feed.publish(180.0);
        assert_eq!(a.target_angle(), 0.0);
        assert_eq!(b.target_angle(), 180.0);

        a.dispose();
        assert!(a.is_disposed());
        b.dispose();
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn test_angle_change_listener() {
        let mut c = at(0.0, 20.0);
        let seen = Rc::new(Cell::new(0usize));
        let counter = seen.clone();
        c.on_angle_change(move |_| counter.set(counter.get() + 1));

        c.advance();
        c.advance();
        assert_eq!(seen.get(), 2);

        c.rotate_manually(-20.0);
        while c.is_animating() {
            c.advance();
        }
        let settled = seen.get();
        assert_eq!(c.current_angle(), 0.0);
        // a settled dial stays quiet
        c.advance();
        c.advance();
        assert_eq!(seen.get(), settled);
        c.dispose();
    }

    #[test]
    fn test_settings_validation() {
        let bad = OrientationSettings {
            damping_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(SettingsError::Damping(0.0)));
        let bad = OrientationSettings {
            epsilon: -1.0,
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(SettingsError::Epsilon(-1.0)));

        let mut c = controller(Rc::new(ManualOnly));
        assert!(c.set_damping_factor(1.5).is_err());
        assert!(c.set_damping_factor(1.0).is_ok());
        c.rotate_manually(90.0);
        c.advance();
        assert_eq!(c.current_angle(), 90.0);
        c.dispose();
    }
}
