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

//! simulated GPS position errors for virtual vehicles. The error is a distance offset along a
//! fixed (random) bearing, its magnitude is computed by a [`NoiseSource`] and scaled by the
//! configured maximum error

use std::{collections::VecDeque, sync::Arc};
use serde::{Serialize,Deserialize};
use strum::{Display, EnumString};
use rand::prelude::*;
use rand::rngs::StdRng;
use ::noise::{NoiseFn, Perlin};
use uom::si::{f64::Length, length::meter};
use odin_common::{angle::Angle360, datetime::EpochMillis, geo::GeoPoint3};

use crate::{
    calibration::{CalibrationLog, CalibrationRecord},
    vehicle::{TelemetryReport, VehicleId},
};

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,Serialize,Deserialize,EnumString,Display)]
#[strum(serialize_all="kebab-case")]
pub enum NoiseKind {
    UniformRandom,
    WhiteNoise,
    Coherent
}

#[derive(Debug,Clone,Serialize,Deserialize)]
pub struct NoiseConfig {
    pub kind: NoiseKind,
    /// offset for a normalized noise value of 1.0
    pub max_error: Length,
    /// number of values to average. None averages over all values since the last reset
    #[serde(default)]
    pub window: Option<usize>,
    /// fixed seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

/// strategy interface for normalized noise values
pub trait NoiseSource: Send {
    fn kind (&self)->NoiseKind;
    fn next_value (&mut self)->f64;
}

/// uniformly distributed in [0,1)
pub struct UniformNoise {
    rng: StdRng
}

impl UniformNoise {
    pub fn new (rng: StdRng)->Self { UniformNoise { rng } }
}

impl NoiseSource for UniformNoise {
    fn kind (&self)->NoiseKind { NoiseKind::UniformRandom }
    fn next_value (&mut self)->f64 { self.rng.random::<f64>() }
}

const WHITE_Q: i32 = 15;

/// sum of three uniform samples mapped into [-1,1] (approximately normal distributed)
pub struct WhiteNoise {
    rng: StdRng,
    c2: f64,
    c3: f64,
}

impl WhiteNoise {
    pub fn new (rng: StdRng)->Self {
        let c1 = ((1 << WHITE_Q) - 1) as f64;
        let c2 = ((c1 / 3.0) as i64) as f64 + 1.0;
        let c3 = 1.0 / c1;
        WhiteNoise { rng, c2, c3 }
    }
}

impl NoiseSource for WhiteNoise {
    fn kind (&self)->NoiseKind { NoiseKind::WhiteNoise }

    fn next_value (&mut self)->f64 {
        let sum: f64 = (0..3).map( |_| self.rng.random::<f64>() * self.c2).sum();
        ((2.0 * sum - 3.0 * (self.c2 - 1.0)) * self.c3).clamp( -1.0, 1.0)
    }
}

const COHERENT_STEP: f64 = 0.01;
const COHERENT_OFFSET: f64 = 1.25;

/// smooth Perlin noise in [-1,1], sampled at equidistant points along a line. Successive values only
/// change slowly, which models the drift of real GPS errors
pub struct CoherentNoise {
    perlin: Perlin,
    counter: u64,
}

impl CoherentNoise {
    pub fn new (mut rng: StdRng)->Self {
        CoherentNoise { perlin: Perlin::new( rng.random()), counter: 0 }
    }

    pub fn value_at (&self, x: f64)->f64 {
        self.perlin.get( [x, 0.0]).clamp( -1.0, 1.0)
    }
}

impl NoiseSource for CoherentNoise {
    fn kind (&self)->NoiseKind { NoiseKind::Coherent }

    fn next_value (&mut self)->f64 {
        let x = self.counter as f64 * COHERENT_STEP + COHERENT_OFFSET;
        self.counter += 1;
        self.value_at( x)
    }
}

/// average of absolute values, either over a sliding window or cumulative since the last reset
#[derive(Debug,Clone,Default)]
pub struct MovingAverage {
    window: Option<usize>,
    values: VecDeque<f64>,
    total: f64,
    count: usize,
}

impl MovingAverage {
    pub fn new (window: Option<usize>)->Self {
        MovingAverage { window: window.filter( |w| *w > 0), ..Default::default() }
    }

    /// add a value and return the new average
    pub fn add (&mut self, value: f64)->f64 {
        let v = value.abs();
        self.total += v;
        self.count += 1;

        if let Some(window) = self.window {
            self.values.push_back( v);
            while self.values.len() > window {
                if let Some(old) = self.values.pop_front() {
                    self.total -= old;
                    self.count -= 1;
                }
            }
        }

        self.average()
    }

    pub fn average (&self)->f64 {
        if self.count == 0 { 0.0 } else { self.total / self.count as f64 }
    }

    pub fn count (&self)->usize { self.count }

    pub fn reset (&mut self) {
        self.values.clear();
        self.total = 0.0;
        self.count = 0;
    }
}

pub fn create_noise_source (kind: NoiseKind, rng: StdRng)->Box<dyn NoiseSource> {
    match kind {
        NoiseKind::UniformRandom => Box::new( UniformNoise::new( rng)),
        NoiseKind::WhiteNoise => Box::new( WhiteNoise::new( rng)),
        NoiseKind::Coherent => Box::new( CoherentNoise::new( rng)),
    }
}

/// perturbs reported positions of a single vehicle
pub struct GpsErrorSimulator {
    max_error: f64,
    source: Box<dyn NoiseSource>,
    average: MovingAverage,
    error_sign: f64,
    error_bearing: Angle360,
    calibration: Option<Arc<CalibrationLog>>,
}

impl GpsErrorSimulator {
    pub fn new (config: &NoiseConfig, calibration: Option<Arc<CalibrationLog>>)->Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64( seed),
            None => StdRng::from_os_rng()
        };
        let error_sign = if rng.random_bool( 0.5) { 1.0 } else { -1.0 };
        let error_bearing = Angle360::from_degrees( rng.random_range( 0.0..360.0));
        let source = create_noise_source( config.kind, StdRng::seed_from_u64( rng.random()));

        GpsErrorSimulator {
            max_error: config.max_error.get::<meter>(),
            source,
            average: MovingAverage::new( config.window),
            error_sign,
            error_bearing,
            calibration
        }
    }

    pub fn kind (&self)->NoiseKind { self.source.kind() }

    pub fn error_bearing (&self)->Angle360 { self.error_bearing }

    /// next normalized correction. Random sources are smoothed and get the fixed sign, coherent
    /// noise is already smooth and signed
    pub fn correction (&mut self)->f64 {
        let value = self.source.next_value();
        match self.source.kind() {
            NoiseKind::Coherent => value,
            _ => self.average.add( value) * self.error_sign
        }
    }

    pub fn reset (&mut self) { self.average.reset() }

    /// offset position and the error distance (in meters, negative is against the error bearing)
    pub fn perturb (&mut self, position: &GeoPoint3)->(GeoPoint3,f64) {
        let error = self.correction() * self.max_error;
        let bearing = if error < 0.0 { self.error_bearing.reciprocal() } else { self.error_bearing };
        let perturbed = position.destination( bearing, Length::new::<meter>( error.abs()));
        (perturbed, error)
    }

    /// a copy of the report with a perturbed position
    pub fn perturb_report (&mut self, report: &TelemetryReport)->TelemetryReport {
        let (pos, error) = self.perturb( &report.position());
        self.log_correction( report.vehicle_id, report.timestamp, error);

        let mut perturbed = report.clone();
        perturbed.latitude = pos.latitude_degrees();
        perturbed.longitude = pos.longitude_degrees();
        perturbed
    }

    fn log_correction (&self, vehicle_id: VehicleId, timestamp: EpochMillis, error: f64) {
        if let Some(log) = &self.calibration {
            log.append( &CalibrationRecord::GpsNoise {
                vehicle_id,
                timestamp,
                kind: self.source.kind(),
                error,
                bearing: self.error_bearing
            });
        }
    }
}
