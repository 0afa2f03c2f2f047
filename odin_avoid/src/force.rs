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

use std::{fmt, ops};
use serde::{Serialize,Deserialize};
use odin_common::angle::Angle360;

/// planar (east,north) vector. Magnitudes are dimensionless
#[derive(Debug,Clone,Copy,PartialEq,Default,Serialize,Deserialize)]
pub struct ForceVector {
    pub east: f64,
    pub north: f64
}

impl ForceVector {
    pub const ZERO: ForceVector = ForceVector { east: 0.0, north: 0.0 };

    pub fn new (east: f64, north: f64)->Self { ForceVector { east, north } }

    /// vector of given magnitude pointing into compass direction `dir`
    pub fn from_polar (magnitude: f64, dir: Angle360)->Self {
        let (e,n) = dir.to_east_north();
        ForceVector { east: magnitude * e, north: magnitude * n }
    }

    pub fn magnitude (&self)->f64 { self.east.hypot( self.north) }

    /// compass direction, None for the null vector
    pub fn direction (&self)->Option<Angle360> {
        if self.is_zero() { None } else { Some( Angle360::from_east_north( self.east, self.north)) }
    }

    pub fn is_zero (&self)->bool { self.east == 0.0 && self.north == 0.0 }
}

impl ops::Add for ForceVector {
    type Output = ForceVector;
    fn add (self, rhs: ForceVector)->ForceVector { ForceVector { east: self.east + rhs.east, north: self.north + rhs.north } }
}

impl ops::AddAssign for ForceVector {
    fn add_assign (&mut self, rhs: ForceVector) { self.east += rhs.east; self.north += rhs.north; }
}

impl ops::Mul<f64> for ForceVector {
    type Output = ForceVector;
    fn mul (self, rhs: f64)->ForceVector { ForceVector { east: self.east * rhs, north: self.north * rhs } }
}

impl std::iter::Sum for ForceVector {
    fn sum<I: Iterator<Item=ForceVector>>(iter: I) -> Self {
        iter.fold( ForceVector::ZERO, |acc,f| acc + f)
    }
}

impl fmt::Display for ForceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction() {
            Some(dir) => write!(f, "{:.3}@{:.0}", self.magnitude(), dir.degrees()),
            None => write!(f, "0")
        }
    }
}
