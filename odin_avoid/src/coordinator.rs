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

use std::{collections::VecDeque, sync::{Arc, Mutex, atomic::{AtomicBool, AtomicU64, Ordering}}, time::Duration};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uom::si::f64::Length;
use odin_common::geo::GeoPoint3;

use crate::{
    errors::{coordinator_unavailable, op_failed, Result},
    vehicle::{Destination, VehicleId, Waypoint, WaypointCommand},
};

/// the service that owns the per-vehicle waypoint queues. This is an external collaborator, we
/// only rely on this interface
#[async_trait]
pub trait WaypointCoordinator: Send + Sync {
    /// the nominal destination at `queue_position` (0 is the current one) of the given vehicle
    async fn query_destination (&self, id: VehicleId, queue_position: usize)->Result<Destination>;

    async fn command_waypoint (&self, command: &WaypointCommand)->Result<()>;
}

#[async_trait]
impl<C> WaypointCoordinator for Arc<C> where C: WaypointCoordinator + ?Sized {
    async fn query_destination (&self, id: VehicleId, queue_position: usize)->Result<Destination> {
        self.as_ref().query_destination( id, queue_position).await
    }

    async fn command_waypoint (&self, command: &WaypointCommand)->Result<()> {
        self.as_ref().command_waypoint( command).await
    }
}

/// in-memory coordinator that keeps a nominal route and a transient avoidance queue per vehicle.
/// Used by the simulator and tests, hence it records all commands and can be told to fail or stall
#[derive(Debug,Default)]
pub struct SimCoordinator {
    nominal: DashMap<VehicleId,VecDeque<Waypoint>>,
    avoidance: DashMap<VehicleId,VecDeque<Waypoint>>,
    commands: Mutex<Vec<WaypointCommand>>,
    fail_queries: AtomicBool,
    fail_commands: AtomicBool,
    response_delay_ms: AtomicU64,
}

impl SimCoordinator {
    pub fn new ()->Self { SimCoordinator::default() }

    /// replace the nominal route of a vehicle. This also clears pending avoidance waypoints
    pub fn set_route (&self, id: VehicleId, route: impl IntoIterator<Item=GeoPoint3>) {
        let queue: VecDeque<Waypoint> = route.into_iter().map( Waypoint::nominal).collect();
        self.nominal.insert( id, queue);
        self.avoidance.remove( &id);
    }

    /// what a real coordinator would send over the wire: (lat,lon,alt) with (-1000,-1000,*) if there is no
    /// waypoint at the requested queue position
    pub fn raw_destination (&self, id: VehicleId, queue_position: usize)->(f64,f64,f64) {
        self.nominal.get( &id)
            .and_then( |q| q.get( queue_position).map( |wp| Destination::Nominal(*wp)))
            .unwrap_or( Destination::Parked)
            .to_lat_lon_alt()
    }

    /// the waypoint the vehicle currently flies to: pending avoidance waypoints take precedence
    pub fn current_target (&self, id: VehicleId)->Option<Waypoint> {
        if let Some(wp) = self.avoidance.get( &id).and_then( |q| q.front().copied()) {
            Some(wp)
        } else {
            self.nominal.get( &id).and_then( |q| q.front().copied())
        }
    }

    /// pop the current target if `position` is within `threshold` of it. Returns the reached waypoint
    pub fn reached (&self, id: VehicleId, position: &GeoPoint3, threshold: Length)->Option<Waypoint> {
        let wp = self.current_target( id)?;
        if position.haversine_distance( &wp.position) > threshold {
            return None
        }

        let queues = if wp.is_avoidance() { &self.avoidance } else { &self.nominal };
        queues.get_mut( &id).and_then( |mut q| q.pop_front())
    }

    pub fn remaining_nominal (&self, id: VehicleId)->usize {
        self.nominal.get( &id).map( |q| q.len()).unwrap_or(0)
    }

    pub fn commands (&self)->Vec<WaypointCommand> {
        self.commands.lock().map( |cmds| cmds.clone()).unwrap_or_default()
    }

    pub fn command_count (&self)->usize {
        self.commands.lock().map( |cmds| cmds.len()).unwrap_or(0)
    }

    pub fn set_fail_queries (&self, fail: bool) { self.fail_queries.store( fail, Ordering::Relaxed) }

    pub fn set_fail_commands (&self, fail: bool) { self.fail_commands.store( fail, Ordering::Relaxed) }

    /// delay all responses, which can be used to trigger client timeouts
    pub fn set_response_delay (&self, delay: Duration) {
        self.response_delay_ms.store( delay.as_millis() as u64, Ordering::Relaxed)
    }

    async fn delay_response (&self) {
        let ms = self.response_delay_ms.load( Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep( Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl WaypointCoordinator for SimCoordinator {
    async fn query_destination (&self, id: VehicleId, queue_position: usize)->Result<Destination> {
        self.delay_response().await;
        if self.fail_queries.load( Ordering::Relaxed) {
            return Err( coordinator_unavailable( format!("query for vehicle {id} rejected")))
        }

        let (lat,lon,alt) = self.raw_destination( id, queue_position);
        Ok( Destination::from_lat_lon_alt( lat, lon, alt))
    }

    async fn command_waypoint (&self, command: &WaypointCommand)->Result<()> {
        self.delay_response().await;
        if self.fail_commands.load( Ordering::Relaxed) {
            return Err( coordinator_unavailable( format!("command for vehicle {} rejected", command.vehicle_id)))
        }

        let queues = if command.is_avoidance { &self.avoidance } else { &self.nominal };
        {
            let mut queue = queues.entry( command.vehicle_id).or_default();
            if command.replace_queue { queue.clear() }
            queue.push_back( command.waypoint);
        }
        debug!("coordinator accepted {}", command);

        self.commands.lock()
            .map_err( |_| op_failed("command log poisoned"))?
            .push( command.clone());
        Ok(())
    }
}
