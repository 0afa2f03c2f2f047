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
//! this module provides the great circle computations we need for local traffic geometry:
//! distance, initial bearing and destination point on a spherical earth (mean radius).
//! As everywhere in ODIN we use the [geo](https://docs.rs/geo/latest/geo/index.html) crate for the
//! algorithms and wrap its types with the new type pattern to add units of measure
//! ([uom](https://docs.rs/uom/latest/uom/)), our normalized [`Angle360`] directions and an altitude.
//! Vehicles can be vertically separated but all horizontal computations are done on the sphere surface

use std::fmt;
use serde::{Serialize,Deserialize};
use geo::{Bearing, Destination, Distance, Point};
use geo::algorithm::line_measures::metric_spaces::Haversine;
use uom::si::f64::Length;
use uom::si::length::meter;

use crate::angle::{Angle360, normalize_180};

/// 3 dimensional point given by a geo::Point with longitude, latitude (both in degrees) and altitude (meters)
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(from="LonLatAlt", into="LonLatAlt")]
pub struct GeoPoint3 {
    point: Point,
    alt: f64
}

impl GeoPoint3 {
    pub fn from_lon_lat_degrees_alt_meters (lon: f64, lat: f64, alt: f64) -> Self {
        GeoPoint3 { point: Point::new( lon, lat), alt }
    }

    fn from_point_alt (point: Point, alt: f64)->Self {
        GeoPoint3 { point: Point::new( normalize_180( point.x()), point.y()), alt }
    }

    #[inline] pub fn longitude_degrees(&self) -> f64 { self.point.x() }
    #[inline] pub fn latitude_degrees(&self) -> f64 { self.point.y() }
    #[inline] pub fn altitude_meters(&self) -> f64 { self.alt }
    #[inline] pub fn altitude(&self) -> Length { Length::new::<meter>(self.alt) }

    pub fn point<'a> (&'a self) -> &'a Point { &self.point }

    /// same horizontal position at a different altitude
    pub fn with_altitude (&self, alt: Length)->GeoPoint3 {
        GeoPoint3 { point: self.point, alt: alt.get::<meter>() }
    }

    /// horizontal great circle distance (ignores altitude)
    pub fn haversine_distance (&self, other: &GeoPoint3)->Length {
        Length::new::<meter>( self.haversine_distance_meters(other))
    }

    pub fn haversine_distance_meters (&self, other: &GeoPoint3)->f64 {
        Haversine.distance( self.point, other.point)
    }

    /// absolute altitude difference
    pub fn vertical_distance (&self, other: &GeoPoint3)->Length {
        Length::new::<meter>( (self.alt - other.alt).abs())
    }

    /// initial great circle bearing from self to other. Returns 0 (north) for coincident points
    pub fn bearing_to (&self, other: &GeoPoint3)->Angle360 {
        if self.point == other.point {
            Angle360::from_degrees(0.0)
        } else {
            Angle360::from_degrees( Haversine.bearing( self.point, other.point))
        }
    }

    /// bearing under which we see self from `other`
    pub fn bearing_from (&self, other: &GeoPoint3)->Angle360 {
        other.bearing_to(self)
    }

    /// the point we get to when travelling `dist` along the great circle that starts with `bearing`.
    /// The altitude is preserved
    pub fn destination (&self, bearing: Angle360, dist: Length)->GeoPoint3 {
        let p = Haversine.destination( self.point, bearing.degrees(), dist.get::<meter>());
        GeoPoint3::from_point_alt( p, self.alt)
    }
}

impl fmt::Display for GeoPoint3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6},{:.6},{:.0}]", self.point.x(), self.point.y(), self.alt)
    }
}

// serialized form. We accept "lon" | "longitude" | "x" etc. so that we can read data written by `geo` types
#[derive(Serialize,Deserialize)]
struct LonLatAlt {
    #[serde(alias="longitude",alias="x")]
    lon: f64,
    #[serde(alias="latitude",alias="y")]
    lat: f64,
    #[serde(alias="altitude",alias="z")]
    alt: f64
}

impl From<LonLatAlt> for GeoPoint3 {
    fn from (p: LonLatAlt)->Self { GeoPoint3::from_lon_lat_degrees_alt_meters( p.lon, p.lat, p.alt) }
}

impl From<GeoPoint3> for LonLatAlt {
    fn from (p: GeoPoint3)->Self { LonLatAlt { lon: p.point.x(), lat: p.point.y(), alt: p.alt } }
}
