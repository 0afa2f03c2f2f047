/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{fmt, future::Future, sync::{Arc, atomic::{AtomicBool, AtomicUsize, Ordering}}};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    AvoidConfig,
    calibration::{CalibrationLog, CalibrationRecord},
    coordinator::WaypointCoordinator,
    errors::Result,
    registry::{UpsertOutcome, VehicleRegistry},
    resolver::{ConflictResolver, Resolution},
    vehicle::{Destination, NO_QUEUE_INDEX, TelemetryReport, Waypoint, WaypointCommand},
};

/// what happened to a single telemetry report
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ReplanOutcome {
    /// replanning has not been activated yet
    Inactive,
    /// report values are out of range
    Rejected,
    /// unknown vehicle without queue information
    Ignored,
    /// older than the registered state
    Stale,
    /// coordinator has no destination left for this vehicle
    Parked,
    Resolved {
        avoiding: bool,
        /// number of dispatched commands
        commands: usize,
        /// number of commands the coordinator did not accept
        failed: usize
    }
}

impl fmt::Display for ReplanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplanOutcome::Resolved{avoiding,commands,failed} => write!(f, "Resolved(avoiding: {avoiding}, commands: {commands}, failed: {failed})"),
            other => write!(f, "{:?}", other)
        }
    }
}

/// the telemetry driven control loop. Each report updates the registry, resolves the reporting
/// vehicle against everybody else and sends corrective waypoints to the coordinator.
/// All operations take `&self` so that reports of different vehicles can be processed concurrently
pub struct Replanner<C> where C: WaypointCoordinator {
    config: Arc<AvoidConfig>,
    registry: VehicleRegistry,
    resolver: ConflictResolver,
    coordinator: C,
    active: AtomicBool,
    calibration: Option<Arc<CalibrationLog>>,
    n_commands: AtomicUsize,
}

impl<C> Replanner<C> where C: WaypointCoordinator {
    pub fn new (config: Arc<AvoidConfig>, coordinator: C)->Self {
        Replanner {
            resolver: ConflictResolver::new( config.clone()),
            config,
            registry: VehicleRegistry::new(),
            coordinator,
            active: AtomicBool::new(false),
            calibration: None,
            n_commands: AtomicUsize::new(0),
        }
    }

    pub fn with_calibration_log (mut self, log: Arc<CalibrationLog>)->Self {
        self.calibration = Some(log);
        self
    }

    pub fn config (&self)->&AvoidConfig { &self.config }
    pub fn registry (&self)->&VehicleRegistry { &self.registry }
    pub fn resolver (&self)->&ConflictResolver { &self.resolver }
    pub fn coordinator (&self)->&C { &self.coordinator }

    /// the administrative start signal. Reports are ignored until this is called
    pub fn activate (&self) {
        if !self.active.swap( true, Ordering::SeqCst) {
            info!("collision avoidance activated");
        }
    }

    pub fn deactivate (&self) {
        if self.active.swap( false, Ordering::SeqCst) {
            info!("collision avoidance deactivated");
        }
    }

    pub fn is_active (&self)->bool { self.active.load( Ordering::SeqCst) }

    /// number of commands the coordinator accepted so far
    pub fn command_count (&self)->usize { self.n_commands.load( Ordering::Relaxed) }

    /// process a single report. An error means the coordinator could not be queried and the report was
    /// dropped without changing the registry
    pub async fn on_telemetry (&self, report: &TelemetryReport)->Result<ReplanOutcome> {
        if !self.is_active() {
            return Ok( ReplanOutcome::Inactive )
        }
        if !report.is_plausible() {
            warn!("rejected implausible report {}", report);
            return Ok( ReplanOutcome::Rejected )
        }

        let id = report.vehicle_id;
        if !self.registry.contains( id) && report.current_waypoint_index == NO_QUEUE_INDEX && !self.config.is_real_vehicle( id) {
            return Ok( ReplanOutcome::Ignored )
        }

        let destination = self.current_destination( report).await?;

        if destination.is_parked() {
            return match self.registry.insert_parked( report) {
                UpsertOutcome::Stale => Ok( ReplanOutcome::Stale ),
                _ => Ok( ReplanOutcome::Parked )
            }
        }

        match self.registry.upsert( report, Some(destination)) {
            UpsertOutcome::Stale => return Ok( ReplanOutcome::Stale ),
            UpsertOutcome::Ignored => return Ok( ReplanOutcome::Ignored ),
            _ => {}
        }

        let snapshot = self.registry.snapshot();
        let resolution = self.resolver.resolve( id, &snapshot)?;
        self.log_force( report, &resolution);

        Ok( self.dispatch_resolution( &destination, resolution).await )
    }

    /// the nominal waypoint at queue position 0, or position 1 if we already arrived at 0
    async fn current_destination (&self, report: &TelemetryReport)->Result<Destination> {
        let id = report.vehicle_id;
        let dest = self.bounded( self.coordinator.query_destination( id, 0)).await?;

        if let Destination::Nominal(wp) = &dest {
            if report.position().haversine_distance( &wp.position) <= self.config.arrival_threshold {
                debug!("vehicle {} arrived at {}", id, wp);
                return self.bounded( self.coordinator.query_destination( id, 1)).await
            }
        }
        Ok(dest)
    }

    async fn bounded<T,F> (&self, f: F)->Result<T> where F: Future<Output=Result<T>> {
        timeout( self.config.coordinator_timeout, f).await?
    }

    async fn dispatch_resolution (&self, destination: &Destination, resolution: Resolution)->ReplanOutcome {
        let mut commands = 0;
        let mut failed = 0;

        if let Some((threat_id, wp)) = resolution.threat_waypoint {
            if self.dispatch( WaypointCommand::avoidance( threat_id, wp)).await {
                commands += 1;
                self.registry.set_avoiding( threat_id, true);
            } else {
                failed += 1;
            }
        }

        let id = resolution.vehicle_id;
        let avoiding = resolution.is_avoidance();

        let mut accepted = true;
        if let Some(wp) = resolution.waypoint {
            if !is_assigned_nominal( &wp, destination) {
                let cmd = WaypointCommand { vehicle_id: id, waypoint: wp, is_avoidance: avoiding, replace_queue: avoiding };
                accepted = self.dispatch( cmd).await;
                if accepted { commands += 1 } else { failed += 1 }
            }
        }

        // the flag only goes up once the coordinator has accepted a corrective waypoint
        if avoiding {
            if accepted { self.registry.set_avoiding( id, true); }
        } else if self.registry.set_avoiding( id, false) == Some(true) {
            info!("vehicle {} released from avoidance", id);
        }

        ReplanOutcome::Resolved { avoiding, commands, failed }
    }

    /// failed commands are not retried, the next report of the vehicle will produce a new one
    async fn dispatch (&self, command: WaypointCommand)->bool {
        match self.bounded( self.coordinator.command_waypoint( &command)).await {
            Ok(()) => {
                self.n_commands.fetch_add( 1, Ordering::Relaxed);
                if command.is_avoidance { info!("dispatched {}", command) } else { debug!("dispatched {}", command) }
                true
            }
            Err(e) => {
                warn!("failed to dispatch {}: {}", command, e);
                false
            }
        }
    }

    fn log_force (&self, report: &TelemetryReport, resolution: &Resolution) {
        if let (Some(log), Some(direction)) = (&self.calibration, resolution.force.direction()) {
            log.append( &CalibrationRecord::Force {
                vehicle_id: report.vehicle_id,
                timestamp: report.timestamp,
                magnitude: resolution.force.magnitude(),
                direction,
                threats: resolution.threats.len(),
                avoiding: resolution.is_avoidance(),
            });
        }
    }

    /// process reports until the channel is closed. Errors only affect the report that caused them
    pub async fn run (&self, rx: kanal::AsyncReceiver<TelemetryReport>) {
        while let Ok(report) = rx.recv().await {
            match self.on_telemetry( &report).await {
                Ok(outcome) => debug!("vehicle {}: {}", report.vehicle_id, outcome),
                Err(e) => warn!("report of vehicle {} dropped: {}", report.vehicle_id, e)
            }
        }
        info!("telemetry channel closed");
    }
}

fn is_assigned_nominal (wp: &Waypoint, destination: &Destination)->bool {
    !wp.is_avoidance() && destination.waypoint().map( |dest| dest.has_same_target( wp)).unwrap_or(false)
}

