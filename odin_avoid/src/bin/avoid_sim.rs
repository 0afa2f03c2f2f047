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

//! encounter simulation: a number of virtual vehicles fly constant speed legs towards their
//! coordinator targets while the replanner resolves conflicts between them. Reports the minimum
//! pairwise separation and the number of avoidance commands

use std::{path::PathBuf, sync::Arc};
use clap::ValueEnum;
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uom::si::{f64::Length, length::meter, velocity::meter_per_second};
use odin_common::{define_cli, check_cli, MinMaxAvg, angle::Angle360, datetime::{EpochMillis, secs_f64}, geo::GeoPoint3};
use odin_avoid::{
    AvoidConfig, Replanner, ReplanOutcome, SimCoordinator, TelemetryReport, load_config,
    calibration::CalibrationLog,
    noise::{GpsErrorSimulator, NoiseConfig, NoiseKind},
    vehicle::{meters, VehicleId},
};

#[derive(Debug,Clone,Copy,PartialEq,Eq,ValueEnum)]
enum Scenario {
    /// two vehicles on reciprocal courses
    HeadOn,
    /// two vehicles on perpendicular courses that meet at the center
    Crossing,
    /// vehicles on a circle, each flying to the opposite point
    Ring
}

define_cli! { ARGS [about="collision avoidance encounter simulation"] =
    config: Option<PathBuf>  [help="RON config file (built-in defaults if not set)", long],
    scenario: Scenario       [help="encounter geometry", long, value_enum, default_value_t=Scenario::Ring],
    vehicles: usize          [help="number of vehicles for the ring scenario", short='n', long, default_value_t=8],
    steps: usize             [help="number of simulation steps", long, default_value_t=600],
    dt: f64                  [help="simulation time step in seconds", long, default_value_t=1.0],
    radius: f64              [help="radius of the encounter area in meters", long, default_value_t=1000.0],
    seed: u64                [help="random seed for GPS errors", long, default_value_t=42],
    noise: Option<NoiseKind> [help="simulate GPS errors of this kind (uniform-random, white-noise, coherent)", long],
    cooperative: bool        [help="also compute avoidance waypoints for the strongest threat", long]
}

const FIRST_ID: VehicleId = 1;

struct SimVehicle {
    id: VehicleId,
    position: GeoPoint3,
    heading: Angle360,
    gps_error: Option<GpsErrorSimulator>,
}

impl SimVehicle {
    fn report (&mut self, speed: f64, timestamp: EpochMillis)->TelemetryReport {
        let report = TelemetryReport {
            vehicle_id: self.id,
            latitude: self.position.latitude_degrees(),
            longitude: self.position.longitude_degrees(),
            altitude: self.position.altitude_meters(),
            heading: self.heading.degrees(),
            groundspeed: speed,
            current_waypoint_index: 0,
            timestamp
        };

        match &mut self.gps_error {
            Some(sim) => sim.perturb_report( &report),
            None => report
        }
    }
}

#[tokio::main]
async fn main()->Result<()> {
    check_cli!(ARGS);

    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new("info")))
        .init();

    let mut config = match &ARGS.config {
        Some(path) => load_config( path)?,
        None => AvoidConfig::default()
    };
    if ARGS.cooperative { config.cooperative = true }
    if let Some(kind) = ARGS.noise {
        config.noise = Some( NoiseConfig { kind, max_error: meters(5.0), window: Some(20), seed: Some(ARGS.seed) });
    }
    let config = Arc::new( config);

    let calibration = match &config.calibration_log {
        Some(path) => Some( Arc::new( CalibrationLog::open( path)?)),
        None => None
    };

    let coordinator = Arc::new( SimCoordinator::new());
    let mut replanner = Replanner::new( config.clone(), coordinator.clone());
    if let Some(log) = &calibration {
        replanner = replanner.with_calibration_log( log.clone());
    }
    replanner.activate();

    let center = GeoPoint3::from_lon_lat_degrees_alt_meters( -122.0, 37.0, 100.0);
    let mut vehicles = create_vehicles( &config, &coordinator, &center, &calibration);
    info!("simulating {:?} encounter with {} vehicles", ARGS.scenario, vehicles.len());

    let speed = config.nominal_speed.get::<meter_per_second>();
    let step_dist = meters( speed * ARGS.dt);
    let t0 = EpochMillis::now();

    let mut separation = MinMaxAvg::new();
    let mut n_avoiding_reports = 0;
    let mut n_failed = 0;

    for step in 0..ARGS.steps {
        let timestamp = t0 + secs_f64( step as f64 * ARGS.dt);

        for v in vehicles.iter_mut() {
            if let Some(target) = coordinator.current_target( v.id) {
                let dist = v.position.haversine_distance( &target.position);
                if dist > Length::new::<meter>(0.0) {
                    v.heading = v.position.bearing_to( &target.position);
                }
                v.position = if dist <= step_dist {
                    target.position.with_altitude( v.position.altitude())
                } else {
                    v.position.destination( v.heading, step_dist)
                };
                coordinator.reached( v.id, &v.position, config.arrival_threshold);
            }
        }

        for v in vehicles.iter_mut() {
            let report = v.report( speed, timestamp);
            match replanner.on_telemetry( &report).await {
                Ok(ReplanOutcome::Resolved{avoiding: true,..}) => n_avoiding_reports += 1,
                Ok(_) => {}
                Err(e) => { n_failed += 1; warn!("report of vehicle {} failed: {}", v.id, e) }
            }
        }

        if let Some(d) = min_separation( &vehicles) {
            separation.add( d);
        }

        if vehicles.iter().all( |v| coordinator.current_target( v.id).is_none()) {
            info!("all vehicles arrived after {} steps", step+1);
            break
        }
    }

    if separation.is_empty() {
        println!("no separation data");
    } else {
        println!("minimum separation: {:.1}m (avg of step minimums: {:.1}m, max: {:.1}m)", separation.min, separation.avg, separation.max);
    }
    println!("commands: {}, avoiding reports: {}, failed reports: {}", replanner.command_count(), n_avoiding_reports, n_failed);

    Ok(())
}

fn create_vehicles (config: &AvoidConfig, coordinator: &SimCoordinator, center: &GeoPoint3, calibration: &Option<Arc<CalibrationLog>>)->Vec<SimVehicle> {
    let r = meters( ARGS.radius);

    // (start, end) legs
    let legs: Vec<(GeoPoint3,GeoPoint3)> = match ARGS.scenario {
        Scenario::HeadOn => {
            // small lateral offset so that the encounter is not perfectly symmetric
            let west = center.destination( Angle360::from_degrees(270.0), r);
            let east = center.destination( Angle360::from_degrees(90.0), r).destination( Angle360::from_degrees(0.0), meters(5.0));
            vec![ (west, east), (east, west) ]
        }
        Scenario::Crossing => {
            let west = center.destination( Angle360::from_degrees(270.0), r);
            let south = center.destination( Angle360::from_degrees(180.0), r);
            vec![
                (west, center.destination( Angle360::from_degrees(90.0), r)),
                (south, center.destination( Angle360::from_degrees(0.0), r))
            ]
        }
        Scenario::Ring => {
            let n = ARGS.vehicles.max(2);
            (0..n).map( |i| {
                let bearing = Angle360::from_degrees( 360.0 * i as f64 / n as f64);
                (center.destination( bearing, r), center.destination( bearing.reciprocal(), r))
            }).collect()
        }
    };

    legs.into_iter().enumerate().map( |(i,(start,end))| {
        let id = FIRST_ID + i as VehicleId;
        coordinator.set_route( id, [end]);

        let gps_error = config.noise.as_ref().map( |nc| {
            let nc = NoiseConfig { seed: nc.seed.map( |s| s + id as u64), ..nc.clone() };
            GpsErrorSimulator::new( &nc, calibration.clone())
        });

        SimVehicle { id, position: start, heading: start.bearing_to( &end), gps_error }
    }).collect()
}

fn min_separation (vehicles: &[SimVehicle])->Option<f64> {
    let mut min: Option<f64> = None;
    for (i,a) in vehicles.iter().enumerate() {
        for b in &vehicles[i+1..] {
            let d = a.position.haversine_distance_meters( &b.position);
            min = Some( min.map_or( d, |m| m.min(d)));
        }
    }
    min
}
