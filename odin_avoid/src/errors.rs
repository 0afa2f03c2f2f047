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

use thiserror::Error;
use odin_common::map_to_opaque_error;

use crate::vehicle::VehicleId;

pub type Result<T> = std::result::Result<T, OdinAvoidError>;

/// odin_avoid specific error type. Errors are `Clone` so that we can record and report them
/// from several places (e.g. simulated coordinators), hence foreign errors are mapped into
/// opaque String variants
#[derive(Error,Debug,Clone)]
pub enum OdinAvoidError {
    #[error("IO error {0}")]
    IOError(String),

    #[error("config error {0}")]
    ConfigError(String),

    #[error("JSON error {0}")]
    JsonError(String),

    /// a coordinator query or command failed or did not respond in time. This only affects the
    /// current cycle of the respective vehicle
    #[error("coordinator unavailable {0}")]
    CoordinatorUnavailable(String),

    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String)
}

map_to_opaque_error!{ std::io::Error => OdinAvoidError::IOError }
map_to_opaque_error!{ serde_json::Error => OdinAvoidError::JsonError }
map_to_opaque_error!{ ron::error::SpannedError => OdinAvoidError::ConfigError }
map_to_opaque_error!{ ron::error::Error => OdinAvoidError::ConfigError }
map_to_opaque_error!{ tokio::time::error::Elapsed => OdinAvoidError::CoordinatorUnavailable }

pub fn op_failed (msg: impl ToString)->OdinAvoidError {
    OdinAvoidError::OpFailed(msg.to_string())
}

pub fn coordinator_unavailable (msg: impl ToString)->OdinAvoidError {
    OdinAvoidError::CoordinatorUnavailable(msg.to_string())
}

pub fn config_error (msg: impl ToString)->OdinAvoidError {
    OdinAvoidError::ConfigError(msg.to_string())
}
