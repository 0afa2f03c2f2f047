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

use std::{cmp::Ordering, fmt, sync::Arc};
use tracing::debug;

use crate::{
    AvoidConfig,
    errors::{OdinAvoidError, Result},
    field::{relative_position, ThreatField},
    force::ForceVector,
    registry::RegistrySnapshot,
    vehicle::{Destination, VehicleId, VehicleState, Waypoint},
};

/// a vehicle in whose field the resolved vehicle is
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct Threat {
    pub vehicle_id: VehicleId,
    pub magnitude: f64,
    /// horizontal distance in meters
    pub distance: f64,
}

/// result of resolving one vehicle against a registry snapshot
#[derive(Debug,Clone,PartialEq)]
pub struct Resolution {
    pub vehicle_id: VehicleId,
    /// None if the vehicle is parked and nothing pushes it
    pub waypoint: Option<Waypoint>,
    /// net repulsive force (without goal vector)
    pub force: ForceVector,
    /// ordered by descending magnitude
    pub threats: Vec<Threat>,
    /// corrective waypoint for the strongest threat if resolved cooperatively
    pub threat_waypoint: Option<(VehicleId,Waypoint)>,
}

impl Resolution {
    pub fn is_avoidance (&self)->bool {
        self.waypoint.as_ref().map( |wp| wp.is_avoidance()).unwrap_or(false)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Resolution( id: {}, force: {}, threats: {}", self.vehicle_id, self.force, self.threats.len())?;
        if let Some(wp) = &self.waypoint { write!( f, ", wp: {}", wp)?; }
        if let Some((id,wp)) = &self.threat_waypoint { write!( f, ", threat {}: {}", id, wp)?; }
        write!( f, " )")
    }
}

/// combines the repulsive forces of all vehicles in whose threat field a vehicle is with the
/// pull towards its nominal destination into a single corrective waypoint
#[derive(Debug,Clone)]
pub struct ConflictResolver {
    config: Arc<AvoidConfig>,
    field: ThreatField,
}

impl ConflictResolver {
    pub fn new (config: Arc<AvoidConfig>)->Self {
        let field = ThreatField::from_config( &config.field);
        ConflictResolver { config, field }
    }

    pub fn config (&self)->&AvoidConfig { &self.config }

    /// the field as seen by `vs`. Vehicles that already avoid see widened fields until they are clear
    pub fn field_for (&self, vs: &VehicleState)->ThreatField {
        if vs.avoiding && self.config.field.exit_radius_factor > 1.0 {
            self.field.widened( self.config.field.exit_radius_factor)
        } else {
            self.field
        }
    }

    /// compute the waypoint for vehicle `self_id` given the other vehicles in `snapshot`.
    /// Results only depend on the snapshot
    pub fn resolve (&self, self_id: VehicleId, snapshot: &RegistrySnapshot)->Result<Resolution> {
        let me = snapshot.get( self_id).ok_or( OdinAvoidError::UnknownVehicle(self_id))?;

        let (force, threats) = self.net_force( me, snapshot);
        let waypoint = self.corrective_waypoint( me, force);

        let threat_waypoint = if self.config.cooperative && !threats.is_empty() {
            self.resolve_strongest_threat( me, &threats, snapshot)
        } else {
            None
        };

        let resolution = Resolution { vehicle_id: self_id, waypoint, force, threats, threat_waypoint };
        debug!("{}", resolution);
        Ok(resolution)
    }

    /// sum of all repulsive forces acting on `me`
    pub fn net_force (&self, me: &VehicleState, snapshot: &RegistrySnapshot)->(ForceVector,Vec<Threat>) {
        let field = self.field_for( me);
        let mut force = ForceVector::ZERO;
        let mut threats: Vec<Threat> = Vec::new();

        for v in snapshot.others( me.id) {
            if v.is_parked() && !self.config.parked_vehicles_are_threats { continue }
            if field.is_vertically_separated( v, me) { continue }

            let rel = relative_position( v, me); // are we in v's field
            let magnitude = field.force_magnitude( self.config.max_force, &rel);
            if magnitude > 0.0 {
                let dir = if rel.distance() > 0.0 { v.position.bearing_to( &me.position) } else { v.heading };
                let f = ForceVector::from_polar( magnitude, dir);
                debug!("vehicle {} in field of {}: dist={:.1}m angle={:.1} force={}", me.id, v.id, rel.distance(), rel.angle().degrees(), f);

                force += f;
                threats.push( Threat { vehicle_id: v.id, magnitude, distance: rel.distance() });
            }
        }

        threats.sort_by( |a,b| b.magnitude.partial_cmp( &a.magnitude).unwrap_or( Ordering::Equal).then( a.vehicle_id.cmp( &b.vehicle_id)));
        (force, threats)
    }

    /// weighted unit vector towards the nominal destination. Zero if parked or already there
    pub fn goal_vector (&self, me: &VehicleState)->ForceVector {
        match &me.destination {
            Destination::Nominal(wp) if me.position.haversine_distance_meters( &wp.position) > 0.0 => {
                ForceVector::from_polar( self.config.nominal_weight, me.position.bearing_to( &wp.position))
            }
            _ => ForceVector::ZERO
        }
    }

    fn corrective_waypoint (&self, me: &VehicleState, force: ForceVector)->Option<Waypoint> {
        if force.is_zero() {
            return me.destination.waypoint().copied()
        }

        let resultant = self.goal_vector( me) + force;
        let heading = resultant.direction()
            .or_else( || force.direction())
            .unwrap_or( me.heading);

        Some( Waypoint::avoidance( me.position.destination( heading, self.config.lookahead)))
    }

    fn resolve_strongest_threat (&self, me: &VehicleState, threats: &[Threat], snapshot: &RegistrySnapshot)->Option<(VehicleId,Waypoint)> {
        let my_field = self.field_for( me);

        let v = threats.iter()
            .filter_map( |t| snapshot.get( t.vehicle_id))
            .find( |v| !v.is_parked() && my_field.contains( me, v))?;

        let (force, _) = self.net_force( v, snapshot);
        match self.corrective_waypoint( v, force) {
            Some(wp) if wp.is_avoidance() => Some( (v.id, wp)),
            _ => None
        }
    }
}
