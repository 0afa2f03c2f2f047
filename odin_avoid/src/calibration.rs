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

use std::{fs::{File, OpenOptions}, io::Write, path::{Path, PathBuf}, sync::Mutex};
use serde::{Serialize,Deserialize};
use tracing::warn;
use odin_common::{angle::{Angle360, ser_rounded_angle}, datetime::EpochMillis};

use crate::{errors::{op_failed, Result}, noise::NoiseKind, vehicle::VehicleId};

/// what we keep for offline tuning of noise and force parameters
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(tag="record")]
pub enum CalibrationRecord {
    GpsNoise {
        vehicle_id: VehicleId,
        timestamp: EpochMillis,
        kind: NoiseKind,
        /// applied position offset in meters
        error: f64,
        #[serde(serialize_with="ser_rounded_angle")]
        bearing: Angle360,
    },
    Force {
        vehicle_id: VehicleId,
        timestamp: EpochMillis,
        magnitude: f64,
        #[serde(serialize_with="ser_rounded_angle")]
        direction: Angle360,
        threats: usize,
        avoiding: bool,
    }
}

/// append-only log of JSON lines. Writing is best effort - a failing log must never affect avoidance
#[derive(Debug)]
pub struct CalibrationLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl CalibrationLog {
    pub fn open<P: AsRef<Path>> (path: P)->Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open( &path)?;
        Ok( CalibrationLog { path, file: Mutex::new(file) })
    }

    pub fn path (&self)->&Path { self.path.as_path() }

    /// write a record. Failures are logged but not reported
    pub fn append (&self, record: &CalibrationRecord) {
        if let Err(e) = self.try_append( record) {
            warn!("failed to write calibration record to {:?}: {}", self.path, e);
        }
    }

    fn try_append (&self, record: &CalibrationRecord)->Result<()> {
        let mut line = serde_json::to_vec( record)?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err( |_| op_failed("calibration log poisoned"))?;
        file.write_all( &line)?;
        file.flush()?;
        Ok(())
    }
}

/// read back all records of a calibration log, skipping lines that can't be parsed
pub fn read_records<P: AsRef<Path>> (path: P)->Result<Vec<CalibrationRecord>> {
    let content = std::fs::read_to_string( path)?;
    Ok( content.lines().filter_map( |line| serde_json::from_str( line).ok()).collect() )
}
