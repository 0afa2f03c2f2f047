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

//! reactive collision avoidance for multiple cooperating vehicles sharing a common airspace.
//!
//! Each vehicle periodically reports its position. The [`replanner::Replanner`] keeps a
//! [`registry::VehicleRegistry`] of all known vehicles, asks the [`coordinator::WaypointCoordinator`]
//! where the reporting vehicle is supposed to go, and lets the [`resolver::ConflictResolver`]
//! compute a corrective waypoint from the repulsive forces of all vehicles whose forward
//! [`field::ThreatField`] the reporting vehicle is in.

use std::{fs, path::{Path,PathBuf}, time::Duration};
use serde::{Serialize,Deserialize};
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::meter_per_second};
use odin_common::{opaque_error, datetime::{deserialize_duration, serialize_duration, secs}};

pub mod errors;
pub mod vehicle;
pub mod registry;
pub mod force;
pub mod field;
pub mod resolver;
pub mod coordinator;
pub mod calibration;
pub mod noise;
pub mod replanner;

use errors::{config_error, OdinAvoidError, Result};
use noise::NoiseConfig;
use vehicle::VehicleId;

pub use vehicle::{Destination, TelemetryReport, VehicleState, Waypoint, WaypointCommand, WaypointKind};
pub use registry::{VehicleRegistry, RegistrySnapshot, UpsertOutcome};
pub use resolver::{ConflictResolver, Resolution};
pub use coordinator::{WaypointCoordinator, SimCoordinator};
pub use replanner::{Replanner, ReplanOutcome};

/// geometry of the forward sector in which a vehicle is considered to be a threat for others
#[derive(Serialize,Deserialize,Debug,Clone)]
pub struct FieldConfig {
    /// angular half width of the sector around the vehicle heading, in degrees
    pub half_angle: f64,
    pub radius: Length,
    /// vehicles that are vertically further apart are never inside each other's field
    #[serde(default)]
    pub vertical_separation: Option<Length>,
    /// radius multiplier (>= 1.0) applied to all fields while a vehicle is flying an avoidance waypoint
    #[serde(default="default_exit_radius_factor")]
    pub exit_radius_factor: f64,
}

fn default_exit_radius_factor()->f64 { 1.0 }

impl Default for FieldConfig {
    fn default()->Self {
        FieldConfig {
            half_angle: 45.0,
            radius: Length::new::<meter>(400.0),
            vertical_separation: None,
            exit_radius_factor: 1.0,
        }
    }
}

#[derive(Serialize,Deserialize,Debug,Clone)]
pub struct AvoidConfig {
    pub field: FieldConfig,
    /// repulsive force magnitude at zero distance
    pub max_force: f64,
    /// weight of the unit vector pointing to the nominal destination
    pub nominal_weight: f64,
    /// distance of the projected avoidance waypoint
    pub lookahead: Length,
    /// a vehicle closer than this to its current nominal waypoint gets the next one in its queue
    pub arrival_threshold: Length,
    /// ground speed of simulated vehicles
    pub nominal_speed: Velocity,
    /// also compute an avoidance waypoint for the strongest threat if it sees us in its own field
    #[serde(default)]
    pub cooperative: bool,
    #[serde(default)]
    pub parked_vehicles_are_threats: bool,
    /// inclusive id range of real (non-simulated) vehicles, which don't report queue positions
    pub real_vehicle_ids: (VehicleId,VehicleId),
    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub coordinator_timeout: Duration,
    #[serde(default)]
    pub calibration_log: Option<PathBuf>,
    #[serde(default)]
    pub noise: Option<NoiseConfig>,
}

impl AvoidConfig {
    pub fn is_real_vehicle (&self, id: VehicleId)->bool {
        id >= self.real_vehicle_ids.0 && id <= self.real_vehicle_ids.1
    }

    /// check values that would silently break the force model
    pub fn validate (&self)->Result<()> {
        if !(self.field.half_angle > 0.0 && self.field.half_angle <= 180.0) {
            return Err( opaque_error!( OdinAvoidError::ConfigError, "field half_angle out of range (0,180]: {}", self.field.half_angle))
        }
        if !(self.field.radius.get::<meter>() > 0.0) {
            return Err( config_error( "field radius has to be positive"))
        }
        if self.field.exit_radius_factor < 1.0 {
            return Err( opaque_error!( OdinAvoidError::ConfigError, "exit_radius_factor has to be >= 1.0: {}", self.field.exit_radius_factor))
        }
        if self.max_force < 0.0 || self.nominal_weight < 0.0 {
            return Err( config_error( "max_force and nominal_weight can't be negative"))
        }
        if !(self.lookahead.get::<meter>() > 0.0) {
            return Err( config_error( "lookahead has to be positive"))
        }
        if self.real_vehicle_ids.0 > self.real_vehicle_ids.1 {
            return Err( opaque_error!( OdinAvoidError::ConfigError, "invalid real vehicle id range {:?}", self.real_vehicle_ids))
        }
        Ok(())
    }
}

impl Default for AvoidConfig {
    fn default()->Self {
        AvoidConfig {
            field: FieldConfig::default(),
            max_force: 1.0,
            nominal_weight: 0.5,
            lookahead: Length::new::<meter>(100.0),
            arrival_threshold: Length::new::<meter>(12.0),
            nominal_speed: Velocity::new::<meter_per_second>(11.176),
            cooperative: false,
            parked_vehicles_are_threats: false,
            real_vehicle_ids: (32,63),
            coordinator_timeout: secs(2),
            calibration_log: None,
            noise: None,
        }
    }
}

/// load a RON config from a file and validate it
pub fn load_config<P: AsRef<Path>> (path: P)->Result<AvoidConfig> {
    let data = fs::read( path.as_ref())?;
    let config: AvoidConfig = ron::de::from_bytes( data.as_slice())?;
    config.validate()?;
    Ok(config)
}
