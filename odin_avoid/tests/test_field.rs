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

use uom::si::{f64::Velocity, velocity::meter_per_second};
use odin_common::{angle::Angle360, datetime::EpochMillis, geo::GeoPoint3, geo_constants::METERS_PER_DEGREE};
use odin_avoid::{
    FieldConfig, Destination, VehicleState,
    field::{field_angle, relative_position, RelativePosition, ThreatField},
    vehicle::meters,
};

fn vehicle (id: i32, lon: f64, lat: f64, alt: f64, heading: f64)->VehicleState {
    VehicleState {
        id,
        position: GeoPoint3::from_lon_lat_degrees_alt_meters( lon, lat, alt),
        heading: Angle360::from_degrees( heading),
        groundspeed: Velocity::new::<meter_per_second>( 11.176),
        destination: Destination::Parked,
        last_update: EpochMillis::new(0),
        avoiding: false
    }
}

fn default_field ()->ThreatField {
    ThreatField::from_config( &FieldConfig::default())
}

// run with "cargo test test_relative_position -- --nocapture"

#[test]
fn test_relative_position () {
    let observer = vehicle( 1, 0.0, 0.0, 100.0, 90.0); // heading east

    let ahead = vehicle( 2, 0.001, 0.0, 100.0, 90.0);
    let rel = relative_position( &observer, &ahead);
    println!("ahead: {rel:?}");
    assert!( (rel.along - 0.001 * METERS_PER_DEGREE).abs() < 1e-3);
    assert!( rel.lateral.abs() < 1e-3);
    assert!( field_angle( &observer, &ahead).degrees().abs() < 1e-6);

    // north of an east bound vehicle is on its port side
    let port = vehicle( 3, 0.0, 0.001, 100.0, 90.0);
    let rel = relative_position( &observer, &port);
    println!("port: {rel:?}");
    assert!( rel.along.abs() < 1e-3);
    assert!( rel.lateral < -100.0);
    assert!( (field_angle( &observer, &port).degrees() + 90.0).abs() < 1e-6);

    let behind = vehicle( 4, -0.001, 0.0, 100.0, 90.0);
    assert!( (field_angle( &observer, &behind).abs_degrees() - 180.0).abs() < 1e-6);

    let same = vehicle( 5, 0.0, 0.0, 100.0, 270.0);
    let rel = relative_position( &observer, &same);
    assert_eq!( rel.distance(), 0.0);
    assert_eq!( rel.angle().degrees(), 0.0);
}

#[test]
fn test_in_field () {
    let field = default_field();
    let observer = vehicle( 1, 0.0, 0.0, 100.0, 90.0);

    assert!( field.contains( &observer, &vehicle( 2, 0.001, 0.0, 100.0, 0.0)));
    assert!( field.contains( &observer, &vehicle( 2, 0.002, 0.001, 100.0, 0.0))); // 26.6deg off the nose
    assert!( !field.contains( &observer, &vehicle( 2, 0.005, 0.0, 100.0, 0.0))); // beyond radius
    assert!( !field.contains( &observer, &vehicle( 2, 0.0, 0.001, 100.0, 0.0))); // abeam
    assert!( !field.contains( &observer, &vehicle( 2, -0.001, 0.0, 100.0, 0.0))); // behind

    // the radius itself is outside
    let r = field.radius().get::<uom::si::length::meter>();
    assert!( !field.in_field( &RelativePosition { along: r, lateral: 0.0 }));
    assert!( field.in_field( &RelativePosition { along: r - 0.01, lateral: 0.0 }));
}

#[test]
fn test_vertical_separation () {
    let config = FieldConfig { vertical_separation: Some( meters(50.0)), ..FieldConfig::default() };
    let field = ThreatField::from_config( &config);
    let observer = vehicle( 1, 0.0, 0.0, 100.0, 90.0);

    assert!( field.contains( &observer, &vehicle( 2, 0.001, 0.0, 140.0, 0.0)));
    assert!( !field.contains( &observer, &vehicle( 2, 0.001, 0.0, 200.0, 0.0)));
    assert!( default_field().contains( &observer, &vehicle( 2, 0.001, 0.0, 200.0, 0.0)));
}

#[test]
fn test_force_magnitude () {
    let field = default_field();
    let max_force = 1.0;
    let r = field.radius().get::<uom::si::length::meter>();

    assert_eq!( field.force_magnitude( max_force, &RelativePosition { along: 0.0, lateral: 0.0 }), max_force);
    assert_eq!( field.force_magnitude( max_force, &RelativePosition { along: r, lateral: 0.0 }), 0.0);
    assert_eq!( field.force_magnitude( max_force, &RelativePosition { along: r + 100.0, lateral: 0.0 }), 0.0);

    // non-increasing and continuous in distance
    let step = 0.5;
    let max_jump = max_force * step / r * 1.0001;
    let mut last = field.force_magnitude( max_force, &RelativePosition { along: 0.0, lateral: 0.0 });
    let mut d = step;
    while d < r + 50.0 {
        let f = field.force_magnitude( max_force, &RelativePosition { along: d, lateral: 0.0 });
        assert!( f <= last, "force increased at {d}m: {last} -> {f}");
        assert!( last - f <= max_jump, "discontinuity at {d}m: {last} -> {f}");
        last = f;
        d += step;
    }
    assert_eq!( last, 0.0);

    // falls off towards the angular edge of the field
    let d = 100.0;
    let mut last = max_force;
    for deg in 0..=45 {
        let a = (deg as f64).to_radians();
        let f = field.force_magnitude( max_force, &RelativePosition { along: d * a.cos(), lateral: d * a.sin() });
        assert!( f <= last + 1e-12);
        last = f;
    }
    println!("force at edge: {last}");
    assert!( last < 1e-6);

    let a = 60f64.to_radians();
    assert_eq!( field.force_magnitude( max_force, &RelativePosition { along: d * a.cos(), lateral: d * a.sin() }), 0.0);
}

#[test]
fn test_widened_field () {
    let field = default_field();
    let wide = field.widened( 1.5);
    let observer = vehicle( 1, 0.0, 0.0, 100.0, 90.0);
    let other = vehicle( 2, 0.0045, 0.0, 100.0, 90.0); // ~500m ahead

    assert!( !field.contains( &observer, &other));
    assert!( wide.contains( &observer, &other));
    assert_eq!( wide.half_angle(), field.half_angle());
}
