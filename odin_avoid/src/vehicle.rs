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

use std::fmt;
use serde::{Serialize,Deserialize};
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::meter_per_second};
use odin_common::{angle::Angle360, datetime::EpochMillis, geo::GeoPoint3};

pub type VehicleId = i32;

/// the `current_waypoint_index` value of simulated vehicles that don't report their queue position
pub const NO_QUEUE_INDEX: i32 = -1;

/// latitude/longitude value the coordinator uses to signal "no destination available"
pub const NO_DESTINATION_COORD: f64 = -1000.0;

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum WaypointKind {
    /// taken from the vehicle's assigned destination queue
    Nominal,
    /// transient corrective target computed by the resolver
    Avoidance
}

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct Waypoint {
    pub position: GeoPoint3,
    pub kind: WaypointKind
}

impl Waypoint {
    pub fn nominal (position: GeoPoint3)->Self { Waypoint { position, kind: WaypointKind::Nominal } }
    pub fn avoidance (position: GeoPoint3)->Self { Waypoint { position, kind: WaypointKind::Avoidance } }

    pub fn is_avoidance (&self)->bool { self.kind == WaypointKind::Avoidance }

    /// two waypoints designate the same target if their horizontal coordinates match. This is
    /// what we use to suppress redundant commands
    pub fn has_same_target (&self, other: &Waypoint)->bool {
        self.position.latitude_degrees() == other.position.latitude_degrees() &&
        self.position.longitude_degrees() == other.position.longitude_degrees()
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.kind, self.position)
    }
}

/// where a vehicle is supposed to go absent of any conflict
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub enum Destination {
    Nominal(Waypoint),
    /// the vehicle has no reachable nominal waypoint left
    Parked
}

impl Destination {
    /// decode the raw coordinator reply, which uses (-1000,-1000,*) to signal that there is no destination
    pub fn from_lat_lon_alt (lat: f64, lon: f64, alt: f64)->Self {
        if lat == NO_DESTINATION_COORD && lon == NO_DESTINATION_COORD {
            Destination::Parked
        } else {
            Destination::Nominal( Waypoint::nominal( GeoPoint3::from_lon_lat_degrees_alt_meters( lon, lat, alt)))
        }
    }

    /// the raw (lat,lon,alt) representation used on the coordinator interface
    pub fn to_lat_lon_alt (&self)->(f64,f64,f64) {
        match self {
            Destination::Nominal(wp) => (wp.position.latitude_degrees(), wp.position.longitude_degrees(), wp.position.altitude_meters()),
            Destination::Parked => (NO_DESTINATION_COORD, NO_DESTINATION_COORD, 0.0)
        }
    }

    pub fn waypoint (&self)->Option<&Waypoint> {
        match self {
            Destination::Nominal(wp) => Some(wp),
            Destination::Parked => None
        }
    }

    pub fn is_parked (&self)->bool { matches!( self, Destination::Parked) }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Nominal(wp) => write!(f, "{}", wp),
            Destination::Parked => write!(f, "Parked")
        }
    }
}

/// periodic position report of a vehicle as it is received from the telemetry transport.
/// This is the wire format, hence we use plain SI numbers (degrees, meters, meters per second)
#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct TelemetryReport {
    pub vehicle_id: VehicleId,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
    pub groundspeed: f64,
    /// position in the path queue, [`NO_QUEUE_INDEX`] if the vehicle does not track it
    pub current_waypoint_index: i32,
    pub timestamp: EpochMillis,
}

impl TelemetryReport {
    pub fn position (&self)->GeoPoint3 {
        GeoPoint3::from_lon_lat_degrees_alt_meters( self.longitude, self.latitude, self.altitude)
    }

    pub fn heading (&self)->Angle360 { Angle360::from_degrees( self.heading) }

    pub fn groundspeed (&self)->Velocity { Velocity::new::<meter_per_second>( self.groundspeed) }

    /// reject obviously corrupted reports before they get anywhere near the registry
    pub fn is_plausible (&self)->bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.altitude.is_finite() &&
        self.heading.is_finite() && self.groundspeed.is_finite() &&
        self.latitude.abs() <= 90.0 && self.longitude.abs() <= 180.0 && self.groundspeed >= 0.0
    }
}

impl fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Telemetry( id: {}, pos: {}, hdg: {:.0}, spd: {:.1}, wp: {}, time: {} )",
                self.vehicle_id, self.position(), self.heading, self.groundspeed, self.current_waypoint_index, self.timestamp)
    }
}

/// the kinematic state we keep for each known vehicle
#[derive(Debug,Clone)]
pub struct VehicleState {
    pub id: VehicleId,
    pub position: GeoPoint3,
    pub heading: Angle360,
    pub groundspeed: Velocity,
    pub destination: Destination,
    pub last_update: EpochMillis,
    /// currently flying towards a corrective (non-nominal) waypoint
    pub avoiding: bool,
}

impl VehicleState {
    pub fn from_report (report: &TelemetryReport, destination: Destination)->Self {
        VehicleState {
            id: report.vehicle_id,
            position: report.position(),
            heading: report.heading(),
            groundspeed: report.groundspeed(),
            destination,
            last_update: report.timestamp,
            avoiding: false
        }
    }

    /// apply the kinematic part of a new report
    pub fn update (&mut self, report: &TelemetryReport) {
        self.position = report.position();
        self.heading = report.heading();
        self.groundspeed = report.groundspeed();
        self.last_update = report.timestamp;
    }

    pub fn is_parked (&self)->bool { self.destination.is_parked() }

    pub fn distance_to (&self, other: &VehicleState)->Length {
        self.position.haversine_distance( &other.position)
    }

    /// horizontal distance to the nominal destination (if any)
    pub fn distance_to_destination (&self)->Option<Length> {
        self.destination.waypoint().map( |wp| self.position.haversine_distance( &wp.position))
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Vehicle( id: {}, pos: {}, hdg: {:.0}, spd: {:.1}, dest: {}, avoiding: {}, time: {} )",
                self.id, self.position, self.heading.degrees(), self.groundspeed.get::<meter_per_second>(),
                self.destination, self.avoiding, self.last_update)
    }
}

/// a waypoint command sent to the coordinator
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct WaypointCommand {
    pub vehicle_id: VehicleId,
    pub waypoint: Waypoint,
    pub is_avoidance: bool,
    /// replace the (avoidance) queue of the vehicle instead of appending to it
    pub replace_queue: bool
}

impl WaypointCommand {
    pub fn avoidance (vehicle_id: VehicleId, waypoint: Waypoint)->Self {
        WaypointCommand { vehicle_id, waypoint, is_avoidance: true, replace_queue: true }
    }
}

impl fmt::Display for WaypointCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "WaypointCommand( id: {}, wp: {}, avoidance: {}, replace: {} )",
                self.vehicle_id, self.waypoint, self.is_avoidance, self.replace_queue)
    }
}

/// convenience for lengths given in meters (config and tests)
#[inline] pub fn meters (m: f64)->Length { Length::new::<meter>(m) }
