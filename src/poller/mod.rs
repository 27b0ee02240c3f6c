// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/edgewatch

//! Health and alarm pollers, plus alarm control

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::core::{EventBus, Session, TaskScheduler};
use crate::device::{AlarmControl, AlarmStatus, DeviceApi, HealthStatus};
use crate::error::Result;

pub const HEALTH_TASK: &str = "health-poll";
pub const ALARM_TASK: &str = "alarm-poll";

/// Refreshes the held health status
pub struct HealthPoller {
    device: Arc<dyn DeviceApi>,
    session: Arc<Session>,
    bus: Arc<EventBus>,
}

impl HealthPoller {
    pub fn new(device: Arc<dyn DeviceApi>, session: Arc<Session>, bus: Arc<EventBus>) -> Self {
        Self { device, session, bus }
    }

    /// On failure the last known status is marked degraded, other fields kept.
    pub async fn poll_once(&self) -> Result<HealthStatus> {
        match self.device.health().await {
            Ok(health) => {
                debug!(status = ?health.status, model_loaded = health.model.loaded, "Health");
                self.session.set_health(health.clone());
                self.bus.publish_health(health.clone());
                Ok(health)
            }
            Err(e) => {
                warn!(code = e.code(), "Health poll failed: {}", e);
                self.session.degrade_health();
                self.bus.publish_health_degraded(&e.to_string());
                Err(e)
            }
        }
    }
}

/// Refreshes the held alarm status
pub struct AlarmPoller {
    device: Arc<dyn DeviceApi>,
    session: Arc<Session>,
    bus: Arc<EventBus>,
}

impl AlarmPoller {
    pub fn new(device: Arc<dyn DeviceApi>, session: Arc<Session>, bus: Arc<EventBus>) -> Self {
        Self { device, session, bus }
    }

    /// On failure the previous status stays as it was.
    pub async fn poll_once(&self) -> Result<AlarmStatus> {
        match self.device.alarm_status().await {
            Ok(alarm) => {
                self.session.set_alarm(alarm.clone());
                self.bus.publish_alarm(alarm.clone());
                Ok(alarm)
            }
            Err(e) => {
                debug!(code = e.code(), "Alarm poll failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Operator alarm actions
pub struct AlarmController {
    device: Arc<dyn DeviceApi>,
    session: Arc<Session>,
    bus: Arc<EventBus>,
}

impl AlarmController {
    pub fn new(device: Arc<dyn DeviceApi>, session: Arc<Session>, bus: Arc<EventBus>) -> Self {
        Self { device, session, bus }
    }

    pub async fn activate(&self) -> Result<AlarmStatus> {
        self.send(AlarmControl::Activate).await
    }

    pub async fn deactivate(&self) -> Result<AlarmStatus> {
        self.send(AlarmControl::Deactivate).await
    }

    /// Pulse the alarm; `None` uses the device's configured duration.
    pub async fn trigger(&self, duration_seconds: Option<f64>) -> Result<AlarmStatus> {
        self.send(AlarmControl::Trigger { duration_seconds }).await
    }

    async fn send(&self, control: AlarmControl) -> Result<AlarmStatus> {
        match self.device.alarm_control(control).await {
            Ok(alarm) => {
                info!(action = control.action(), active = alarm.active, "Alarm updated");
                self.session.set_alarm(alarm.clone());
                self.bus.publish_alarm(alarm.clone());
                Ok(alarm)
            }
            Err(e) => {
                warn!(action = control.action(), code = e.code(), "Alarm control failed: {}", e);
                self.bus.publish_error(&e);
                Err(e)
            }
        }
    }
}

/// Runs both pollers as separate named tasks
pub struct Pollers {
    health: Arc<HealthPoller>,
    alarm: Arc<AlarmPoller>,
    tasks: Arc<TaskScheduler>,
    config: PollingConfig,
}

impl Pollers {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        session: Arc<Session>,
        bus: Arc<EventBus>,
        tasks: Arc<TaskScheduler>,
        config: PollingConfig,
    ) -> Self {
        Self {
            health: Arc::new(HealthPoller::new(device.clone(), session.clone(), bus.clone())),
            alarm: Arc::new(AlarmPoller::new(device, session, bus)),
            tasks,
            config,
        }
    }

    pub fn health(&self) -> &HealthPoller {
        &self.health
    }

    pub fn alarm(&self) -> &AlarmPoller {
        &self.alarm
    }

    /// Poll both right away, then on their intervals
    pub fn start(&self) {
        let health = self.health.clone();
        self.tasks.schedule_immediate(
            HEALTH_TASK,
            Duration::from_secs(self.config.health_interval_secs),
            move || {
                let health = health.clone();
                async move {
                    let _ = health.poll_once().await;
                }
            },
        );

        let alarm = self.alarm.clone();
        self.tasks.schedule_immediate(
            ALARM_TASK,
            Duration::from_secs(self.config.alarm_interval_secs),
            move || {
                let alarm = alarm.clone();
                async move {
                    let _ = alarm.poll_once().await;
                }
            },
        );
        info!(
            "Polling health every {}s, alarm every {}s",
            self.config.health_interval_secs, self.config.alarm_interval_secs
        );
    }

    pub fn stop(&self) {
        self.tasks.cancel(HEALTH_TASK);
        self.tasks.cancel(ALARM_TASK);
    }

    pub fn is_running(&self) -> bool {
        self.tasks.is_scheduled(HEALTH_TASK) && self.tasks.is_scheduled(ALARM_TASK)
    }
}
