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

use std::{fs, path::PathBuf, sync::Arc};
use odin_common::{angle::Angle360, datetime::EpochMillis, geo::GeoPoint3};
use odin_avoid::{
    AvoidConfig, Replanner, SimCoordinator, TelemetryReport,
    calibration::{read_records, CalibrationLog, CalibrationRecord},
    noise::{GpsErrorSimulator, NoiseConfig, NoiseKind},
    vehicle::meters,
};

fn tmp_log (name: &str)->PathBuf {
    let path = std::env::temp_dir().join( format!("odin_avoid_{}_{}.jsonl", name, std::process::id()));
    let _ = fs::remove_file( &path);
    path
}

fn report (id: i32, lon: f64, millis: i64)->TelemetryReport {
    TelemetryReport {
        vehicle_id: id, latitude: 0.0, longitude: lon, altitude: 100.0, heading: 90.0,
        groundspeed: 11.176, current_waypoint_index: 0, timestamp: EpochMillis::new(millis)
    }
}

// run with "cargo test test_append -- --nocapture"

#[test]
fn test_append () {
    let path = tmp_log( "append");
    let log = CalibrationLog::open( &path).unwrap();

    let rec = CalibrationRecord::Force {
        vehicle_id: 1, timestamp: EpochMillis::new(1000), magnitude: 0.5,
        direction: Angle360::from_degrees( 90.4), threats: 1, avoiding: true
    };
    log.append( &rec);
    drop(log);

    // re-opening appends
    let log = CalibrationLog::open( &path).unwrap();
    log.append( &rec);

    let content = fs::read_to_string( &path).unwrap();
    println!("{content}");
    assert_eq!( content.lines().count(), 2);
    assert!( content.contains( "\"record\":\"Force\""));
    assert!( content.contains( "\"direction\":90,")); // rounded to full degrees

    let records = read_records( &path).unwrap();
    assert_eq!( records.len(), 2);
    match &records[0] {
        CalibrationRecord::Force { vehicle_id, direction, avoiding, .. } => {
            assert_eq!( *vehicle_id, 1);
            assert_eq!( direction.degrees(), 90.0);
            assert!( *avoiding);
        }
        other => panic!("unexpected record {other:?}")
    }

    let _ = fs::remove_file( &path);
}

#[test]
fn test_open_failure () {
    assert!( CalibrationLog::open( "/no/such/dir/calibration.jsonl").is_err());
}

#[test]
fn test_gps_noise_records () {
    let path = tmp_log( "gps");
    let log = Arc::new( CalibrationLog::open( &path).unwrap());
    let config = NoiseConfig { kind: NoiseKind::WhiteNoise, max_error: meters(5.0), window: None, seed: Some(1) };
    let mut sim = GpsErrorSimulator::new( &config, Some(log.clone()));

    for i in 0..5 {
        sim.perturb_report( &report( 3, 0.0, 1000 + i));
    }

    let records = read_records( log.path()).unwrap();
    assert_eq!( records.len(), 5);
    assert!( records.iter().all( |r| matches!( r, CalibrationRecord::GpsNoise { vehicle_id: 3, kind: NoiseKind::WhiteNoise, .. })));

    let _ = fs::remove_file( &path);
}

#[tokio::test]
async fn test_force_records () {
    let path = tmp_log( "force");
    let log = Arc::new( CalibrationLog::open( &path).unwrap());

    let coordinator = Arc::new( SimCoordinator::new());
    coordinator.set_route( 1, [GeoPoint3::from_lon_lat_degrees_alt_meters( 0.01, 0.0, 100.0)]);
    coordinator.set_route( 2, [GeoPoint3::from_lon_lat_degrees_alt_meters( 0.02, 0.0, 100.0)]);

    let replanner = Replanner::new( Arc::new( AvoidConfig::default()), coordinator).with_calibration_log( log);
    replanner.activate();

    replanner.on_telemetry( &report( 1, 0.0, 1000)).await.unwrap();   // no force, no record
    replanner.on_telemetry( &report( 2, 0.001, 1000)).await.unwrap(); // pushed by 1

    let records = read_records( &path).unwrap();
    assert_eq!( records.len(), 1);
    match &records[0] {
        CalibrationRecord::Force { vehicle_id, threats, direction, .. } => {
            assert_eq!( *vehicle_id, 2);
            assert_eq!( *threats, 1);
            assert_eq!( direction.degrees(), 90.0);
        }
        other => panic!("unexpected record {other:?}")
    }

    let _ = fs::remove_file( &path);
}
