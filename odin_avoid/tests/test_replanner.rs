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

use std::{sync::Arc, time::Duration};
use odin_common::{datetime::{EpochMillis, millis}, geo::GeoPoint3};
use odin_avoid::{
    AvoidConfig, Destination, ReplanOutcome, Replanner, SimCoordinator, TelemetryReport,
    errors::OdinAvoidError,
    vehicle::NO_QUEUE_INDEX,
};

fn report (id: i32, lon: f64, lat: f64, heading: f64, millis: i64)->TelemetryReport {
    TelemetryReport {
        vehicle_id: id,
        latitude: lat,
        longitude: lon,
        altitude: 100.0,
        heading,
        groundspeed: 11.176,
        current_waypoint_index: 0,
        timestamp: EpochMillis::new( millis)
    }
}

fn point (lon: f64, lat: f64)->GeoPoint3 {
    GeoPoint3::from_lon_lat_degrees_alt_meters( lon, lat, 100.0)
}

fn replanner (config: AvoidConfig)->(Arc<SimCoordinator>, Replanner<Arc<SimCoordinator>>) {
    let coordinator = Arc::new( SimCoordinator::new());
    let replanner = Replanner::new( Arc::new( config), coordinator.clone());
    replanner.activate();
    (coordinator, replanner)
}

// run with "cargo test test_inactive -- --nocapture"

#[tokio::test]
async fn test_inactive () {
    let coordinator = Arc::new( SimCoordinator::new());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    let replanner = Replanner::new( Arc::new( AvoidConfig::default()), coordinator.clone());

    assert!( !replanner.is_active());
    assert_eq!( replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap(), ReplanOutcome::Inactive);
    assert!( replanner.registry().is_empty());

    replanner.activate();
    assert!( matches!( replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 2000)).await.unwrap(), ReplanOutcome::Resolved{..}));
    assert_eq!( replanner.registry().len(), 1);
}

#[tokio::test]
async fn test_unknown_without_queue_info () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_route( 40, [point( 0.01, 0.0)]);

    let mut r = report( 1, 0.0, 0.0, 90.0, 1000);
    r.current_waypoint_index = NO_QUEUE_INDEX;
    assert_eq!( replanner.on_telemetry( &r).await.unwrap(), ReplanOutcome::Ignored);
    assert!( !replanner.registry().contains( 1));
    assert_eq!( coordinator.command_count(), 0);

    // real vehicles don't report queue positions
    let mut r = report( 40, 0.0, 0.0, 90.0, 1000);
    r.current_waypoint_index = NO_QUEUE_INDEX;
    assert!( matches!( replanner.on_telemetry( &r).await.unwrap(), ReplanOutcome::Resolved{..}));
    assert!( replanner.registry().contains( 40));
}

#[tokio::test]
async fn test_parked () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());

    // no route -> coordinator returns the sentinel
    let (lat,lon,_) = coordinator.raw_destination( 7, 0);
    assert_eq!( (lat,lon), (-1000.0, -1000.0));

    assert_eq!( replanner.on_telemetry( &report( 7, 0.001, 0.0, 90.0, 1000)).await.unwrap(), ReplanOutcome::Parked);
    let vs = replanner.registry().get( 7).unwrap();
    assert_eq!( vs.destination, Destination::Parked);
    assert_eq!( vs.position.longitude_degrees(), 0.001);
    assert_eq!( coordinator.command_count(), 0);

    // a vehicle inside the field of a parked one is not pushed
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    let outcome = replanner.on_telemetry( &report( 1, 0.002, 0.0, 90.0, 1000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: false, commands: 0, failed: 0 });
}

#[tokio::test]
async fn test_avoidance_dispatch () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_route( 2, [point( 0.02, 0.0)]);

    // A alone: nominal, nothing to send
    let outcome = replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: false, commands: 0, failed: 0 });

    // B right in front of A
    let outcome = replanner.on_telemetry( &report( 2, 0.001, 0.0, 90.0, 1000)).await.unwrap();
    println!("B: {outcome}");
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: true, commands: 1, failed: 0 });

    let cmds = coordinator.commands();
    assert_eq!( cmds.len(), 1);
    let cmd = &cmds[0];
    assert_eq!( cmd.vehicle_id, 2);
    assert!( cmd.is_avoidance && cmd.replace_queue);
    assert!( cmd.waypoint.is_avoidance());
    assert!( replanner.registry().get( 2).unwrap().avoiding);
    assert_eq!( coordinator.current_target( 2), Some( cmd.waypoint));

    // A again: still nominal, no redundant command
    let outcome = replanner.on_telemetry( &report( 1, 0.0001, 0.0, 90.0, 2000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: false, commands: 0, failed: 0 });
    assert_eq!( replanner.command_count(), 1);

    // B out of range: released
    let outcome = replanner.on_telemetry( &report( 2, 0.006, 0.0, 90.0, 3000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: false, commands: 0, failed: 0 });
    assert!( !replanner.registry().get( 2).unwrap().avoiding);
}

#[tokio::test]
async fn test_cooperative_dispatch () {
    let (coordinator, replanner) = replanner( AvoidConfig { cooperative: true, ..AvoidConfig::default() });
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_route( 2, [point( -0.01, 0.0)]);

    replanner.on_telemetry( &report( 2, 0.002, 0.00001, 270.0, 1000)).await.unwrap();
    let outcome = replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();
    println!("A: {outcome}");

    // B has been resolved first without A, so both commands come from A's report
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: true, commands: 2, failed: 0 });
    let ids: Vec<i32> = coordinator.commands().iter().map( |c| c.vehicle_id).collect();
    assert_eq!( ids, vec![2, 1]);
    assert!( replanner.registry().get( 2).unwrap().avoiding);
}

#[tokio::test]
async fn test_coordinator_timeout () {
    let config = AvoidConfig { coordinator_timeout: millis(50), ..AvoidConfig::default() };
    let (coordinator, replanner) = replanner( config);
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_response_delay( Duration::from_millis(300));

    let res = replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await;
    println!("timeout result: {res:?}");
    assert!( matches!( res, Err(OdinAvoidError::CoordinatorUnavailable(_))));
    assert!( replanner.registry().is_empty());

    coordinator.set_response_delay( Duration::ZERO);
    assert!( replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 2000)).await.is_ok());
    assert!( replanner.registry().contains( 1));
}

#[tokio::test]
async fn test_query_failure_keeps_registry () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();

    coordinator.set_fail_queries( true);
    assert!( replanner.on_telemetry( &report( 1, 0.001, 0.0, 90.0, 2000)).await.is_err());

    let vs = replanner.registry().get( 1).unwrap();
    assert_eq!( vs.position.longitude_degrees(), 0.0);
    assert_eq!( vs.last_update, EpochMillis::new( 1000));
}

#[tokio::test]
async fn test_failed_dispatch () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_route( 2, [point( 0.02, 0.0)]);
    coordinator.set_fail_commands( true);

    replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();
    let outcome = replanner.on_telemetry( &report( 2, 0.001, 0.0, 90.0, 1000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: true, commands: 0, failed: 1 });

    // the registry is updated regardless, and nothing gets retried
    assert_eq!( replanner.registry().get( 2).unwrap().position.longitude_degrees(), 0.001);
    assert_eq!( coordinator.command_count(), 0);
    assert_eq!( replanner.command_count(), 0);

    // no corrective waypoint was accepted, so the vehicle is not flying one
    assert!( !replanner.registry().get( 2).unwrap().avoiding);
}

#[tokio::test]
async fn test_failed_dispatch_no_hysteresis () {
    let mut config = AvoidConfig::default();
    config.field.exit_radius_factor = 2.0;
    let (coordinator, replanner) = replanner( config);
    coordinator.set_route( 1, [point( 0.05, 0.0)]);
    coordinator.set_route( 2, [point( 0.05, 0.0)]);

    coordinator.set_fail_commands( true);
    replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();
    let outcome = replanner.on_telemetry( &report( 2, 0.001, 0.0, 90.0, 1000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Resolved{ avoiding: true, commands: 0, failed: 1 });
    assert!( !replanner.registry().get( 2).unwrap().avoiding);

    // ~600m ahead is outside the 400m field, and without an accepted avoidance waypoint
    // the field is not widened
    coordinator.set_fail_commands( false);
    let outcome = replanner.on_telemetry( &report( 2, 0.0054, 0.0, 90.0, 2000)).await.unwrap();
    println!("outcome at 600m: {outcome}");
    assert!( matches!( outcome, ReplanOutcome::Resolved{ avoiding: false, .. }));
    assert!( coordinator.commands().iter().all( |c| !c.is_avoidance));
    assert!( !replanner.registry().get( 2).unwrap().avoiding);
}

#[tokio::test]
async fn test_stale_and_rejected () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.01, 0.0)]);

    replanner.on_telemetry( &report( 1, 0.001, 0.0, 90.0, 2000)).await.unwrap();
    assert_eq!( replanner.on_telemetry( &report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap(), ReplanOutcome::Stale);
    assert_eq!( replanner.registry().get( 1).unwrap().position.longitude_degrees(), 0.001);

    let mut r = report( 1, 0.0, 0.0, 90.0, 3000);
    r.latitude = f64::NAN;
    assert_eq!( replanner.on_telemetry( &r).await.unwrap(), ReplanOutcome::Rejected);
}

#[tokio::test]
async fn test_arrival () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    coordinator.set_route( 1, [point( 0.001, 0.0), point( 0.01, 0.0)]);

    // ~5.5m short of the first waypoint
    replanner.on_telemetry( &report( 1, 0.00095, 0.0, 90.0, 1000)).await.unwrap();
    let vs = replanner.registry().get( 1).unwrap();
    assert_eq!( vs.destination.waypoint().unwrap().position, point( 0.01, 0.0));

    // arrived at the last waypoint -> parked
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    let outcome = replanner.on_telemetry( &report( 1, 0.01, 0.0, 90.0, 2000)).await.unwrap();
    assert_eq!( outcome, ReplanOutcome::Parked);
    assert!( replanner.registry().get( 1).unwrap().is_parked());
}

#[tokio::test]
async fn test_run () {
    let (coordinator, replanner) = replanner( AvoidConfig::default());
    let replanner = Arc::new( replanner);
    coordinator.set_route( 1, [point( 0.01, 0.0)]);
    coordinator.set_route( 2, [point( 0.02, 0.0)]);

    let (tx, rx) = kanal::bounded_async::<TelemetryReport>(16);
    let jh = {
        let replanner = replanner.clone();
        tokio::spawn( async move { replanner.run( rx).await })
    };

    coordinator.set_fail_queries( true); // errors must not terminate the loop
    tx.send( report( 1, 0.0, 0.0, 90.0, 500)).await.unwrap();
    tokio::time::sleep( millis(50)).await;
    coordinator.set_fail_queries( false);

    tx.send( report( 1, 0.0, 0.0, 90.0, 1000)).await.unwrap();
    tx.send( report( 2, 0.001, 0.0, 90.0, 1000)).await.unwrap();

    for _ in 0..100 {
        if replanner.registry().len() == 2 && coordinator.command_count() == 1 { break }
        tokio::time::sleep( millis(10)).await;
    }
    assert_eq!( replanner.registry().len(), 2);
    assert_eq!( coordinator.command_count(), 1);

    drop(tx);
    tokio::time::timeout( millis(1000), jh).await.unwrap().unwrap();
}
