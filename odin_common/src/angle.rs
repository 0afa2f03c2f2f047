/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
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

//! normalized angles in degrees. We only need two kinds: compass directions [0..360) and signed
//! relative angles (-180..180], e.g. the angle of a target relative to our own heading

use std::{fmt, marker::PhantomData, ops, cmp};
use serde::{Serializer, Deserializer, Deserialize, Serialize};

#[inline]
pub fn normalize_180 (d: f64) -> f64 {
    let x = d % 360.0;

    if x <= -180.0 { 360.0 + x }
    else if x > 180.0 { x - 360.0 }
    else { x }
}

#[inline]
pub fn normalize_360 (d: f64) -> f64 {
    let x = d % 360.0;
    if x < 0.0 { 360.0 + x } else { x }
}

pub trait AngleKind {
    fn normalize(v: f64)->f64;
    fn name()->&'static str;
}

#[derive(Debug,Clone,Copy)]
pub struct PiKind {}
impl AngleKind for PiKind {
    fn normalize(v: f64) -> f64 { normalize_180(v) }
    fn name()->&'static str { "Angle180" }
}

#[derive(Debug,Clone,Copy)]
pub struct FullCircleKind {}
impl AngleKind for FullCircleKind {
    fn normalize(v: f64) -> f64 { normalize_360(v) }
    fn name()->&'static str { "Angle360" }
}

#[derive(Copy, Clone)]
pub struct NormalizedAngle<K> where K: AngleKind {
    value: f64,
    kind: PhantomData<K>,
}

impl<K> NormalizedAngle<K> where K: AngleKind {
    #[inline]
    pub fn from_degrees(deg: f64) -> Self {
        NormalizedAngle { value: K::normalize(deg), kind: PhantomData }
    }

    pub fn from_radians(rad: f64) -> Self {
        NormalizedAngle { value: K::normalize(rad.to_degrees()), kind: PhantomData }
    }

    #[inline] pub fn radians(&self)->f64 { self.value.to_radians() }
    #[inline] pub fn degrees(&self)->f64 { self.value }

    #[inline] pub fn sin(&self)->f64 { self.value.to_radians().sin() }
    #[inline] pub fn cos(&self)->f64 { self.value.to_radians().cos() }
}

/// compass direction, clockwise from north
pub type Angle360 = NormalizedAngle<FullCircleKind>;

/// signed angle, positive is clockwise
pub type Angle180 = NormalizedAngle<PiKind>;

impl Angle360 {
    /// the opposite direction
    pub fn reciprocal (&self)->Angle360 { Angle360::from_degrees( self.value + 180.0) }

    /// signed angle we have to turn from `reference` to get to self
    pub fn relative_to (&self, reference: Angle360)->Angle180 {
        Angle180::from_degrees( self.value - reference.value)
    }

    /// direction of a planar (east,north) vector. This is undefined for the null vector, for
    /// which we return 0 (north)
    pub fn from_east_north (east: f64, north: f64)->Angle360 {
        if east == 0.0 && north == 0.0 {
            Angle360::from_degrees(0.0)
        } else {
            Angle360::from_radians( east.atan2(north))
        }
    }

    /// unit vector (east,north) for this direction
    pub fn to_east_north (&self)->(f64,f64) {
        let r = self.radians();
        (r.sin(), r.cos())
    }
}

impl Angle180 {
    pub fn abs_degrees (&self)->f64 { self.value.abs() }
}

impl <K> From<NormalizedAngle<K>> for f64 where K: AngleKind {
    fn from(a: NormalizedAngle<K>) -> Self { a.value }
}

impl<K> fmt::Display for NormalizedAngle<K> where K: AngleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}deg", self.value) }
}

impl<K> fmt::Debug for NormalizedAngle<K> where K: AngleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}({})", K::name(), self.value) }
}

impl<K> cmp::PartialOrd for NormalizedAngle<K> where K: AngleKind {
    fn partial_cmp(&self,other:&Self) -> Option<cmp::Ordering> { self.value.partial_cmp( &other.value) }
}

impl<K> cmp::PartialEq for NormalizedAngle<K> where K: AngleKind {
    fn eq(&self, other: &Self) -> bool { self.value == other.value }
}

// addition and subtraction is only allowed with same kind of angle
impl<K> ops::Add<NormalizedAngle<K>> for NormalizedAngle<K> where K: AngleKind {
    type Output = Self;
    fn add (self,rhs:NormalizedAngle<K>) -> Self::Output { NormalizedAngle::from_degrees( self.value + rhs.value) }
}
impl<K> ops::Sub<NormalizedAngle<K>> for NormalizedAngle<K> where K: AngleKind {
    type Output = Self;
    fn sub (self,rhs:NormalizedAngle<K>) -> Self::Output { NormalizedAngle::from_degrees( self.value - rhs.value) }
}

// turning a compass direction
impl ops::Add<Angle180> for Angle360 {
    type Output = Angle360;
    fn add (self, rhs: Angle180) -> Angle360 { Angle360::from_degrees( self.value + rhs.value) }
}

//--- serde support (plain f64 degrees, normalized on input)

impl<K> Serialize for NormalizedAngle<K> where K: AngleKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_f64(self.value)
    }
}

impl<'de,K> Deserialize<'de> for NormalizedAngle<K> where K: AngleKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        let deg = f64::deserialize(deserializer)?;
        if deg.is_finite() {
            Ok( NormalizedAngle::from_degrees(deg) )
        } else {
            Err( serde::de::Error::custom( format!("not a valid angle: {deg}")) )
        }
    }
}

/// for serialized output if we don't need more than full degree precision
pub fn ser_rounded_angle<S: Serializer,K: AngleKind> (angle: &NormalizedAngle<K>, s: S) -> Result<S::Ok, S::Error>  {
    s.serialize_i32( angle.degrees().round() as i32)
}
