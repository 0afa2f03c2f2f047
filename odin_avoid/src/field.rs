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

//! threat field geometry. All functions in here are pure, they only look at the two vehicle
//! states they are given

use uom::si::{f64::Length, length::meter};
use odin_common::{angle::Angle180, HALF_PI};

use crate::{FieldConfig, vehicle::VehicleState};

/// position of another vehicle in the body frame of an observer: `along` the observer heading and
/// `lateral` to it (positive is starboard), both in meters
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct RelativePosition {
    pub along: f64,
    pub lateral: f64
}

impl RelativePosition {
    pub fn distance (&self)->f64 { self.along.hypot( self.lateral) }

    /// 0 is dead ahead, positive is clockwise. Coincident positions count as dead ahead
    pub fn angle (&self)->Angle180 {
        if self.along == 0.0 && self.lateral == 0.0 {
            Angle180::from_degrees(0.0)
        } else {
            Angle180::from_radians( self.lateral.atan2( self.along))
        }
    }
}

/// where is `other` as seen from `observer` (in the frame of the observer heading)
pub fn relative_position (observer: &VehicleState, other: &VehicleState)->RelativePosition {
    let d = observer.position.haversine_distance_meters( &other.position);
    if d == 0.0 {
        RelativePosition { along: 0.0, lateral: 0.0 }
    } else {
        let theta = observer.position.bearing_to( &other.position).relative_to( observer.heading);
        RelativePosition { along: d * theta.cos(), lateral: d * theta.sin() }
    }
}

/// angle under which `observer` sees `other`, relative to its own heading
pub fn field_angle (observer: &VehicleState, other: &VehicleState)->Angle180 {
    relative_position( observer, other).angle()
}

/// the forward sector around a vehicle heading within which other vehicles are repelled
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct ThreatField {
    half_angle: f64,
    radius: f64,
    vertical_separation: Option<f64>,
}

impl ThreatField {
    pub fn new (half_angle: f64, radius: Length, vertical_separation: Option<Length>)->Self {
        ThreatField {
            half_angle,
            radius: radius.get::<meter>(),
            vertical_separation: vertical_separation.map( |l| l.get::<meter>())
        }
    }

    pub fn from_config (config: &FieldConfig)->Self {
        ThreatField::new( config.half_angle, config.radius, config.vertical_separation)
    }

    /// same field with a scaled radius
    pub fn widened (&self, factor: f64)->Self {
        ThreatField { radius: self.radius * factor, ..*self }
    }

    pub fn half_angle (&self)->f64 { self.half_angle }
    pub fn radius (&self)->Length { Length::new::<meter>( self.radius) }

    /// inside the angular sector and strictly inside the radius
    pub fn in_field (&self, rel: &RelativePosition)->bool {
        rel.angle().abs_degrees() <= self.half_angle && rel.distance() < self.radius
    }

    /// is `other` inside the field of `observer`
    pub fn contains (&self, observer: &VehicleState, other: &VehicleState)->bool {
        !self.is_vertically_separated( observer, other) && self.in_field( &relative_position( observer, other))
    }

    pub fn is_vertically_separated (&self, observer: &VehicleState, other: &VehicleState)->bool {
        match self.vertical_separation {
            Some(sep) => observer.position.vertical_distance( &other.position).get::<meter>() > sep,
            None => false
        }
    }

    /// repulsive magnitude for a vehicle at `rel`: `max_force` at zero distance, falling off linearly
    /// with distance and with the cosine of the scaled field angle. Zero on and outside the field boundary
    pub fn force_magnitude (&self, max_force: f64, rel: &RelativePosition)->f64 {
        if !self.in_field( rel) {
            0.0
        } else {
            let range_factor = 1.0 - rel.distance() / self.radius;
            let angle_factor = (HALF_PI * rel.angle().abs_degrees() / self.half_angle).cos();
            (max_force * range_factor * angle_factor).max(0.0)
        }
    }
}
