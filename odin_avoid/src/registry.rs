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

use std::{collections::BTreeMap, sync::Arc};
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug,info};
use odin_common::datetime::EpochMillis;

use crate::vehicle::{Destination, TelemetryReport, VehicleId, VehicleState};

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// unknown vehicle and no destination to register it with
    Ignored,
    /// report is older than what we already have
    Stale
}

/// the single source of truth for vehicle states. Clones are cheap and refer to the same map,
/// writes are serialized per vehicle by the map shard locks
#[derive(Debug,Clone,Default)]
pub struct VehicleRegistry {
    vehicles: Arc<DashMap<VehicleId,VehicleState>>,
}

impl VehicleRegistry {
    pub fn new ()->Self {
        VehicleRegistry { vehicles: Arc::new( DashMap::new()) }
    }

    /// update kinematic state (and destination if provided) of a known vehicle, or insert a new one
    /// if we have a destination for it
    pub fn upsert (&self, report: &TelemetryReport, destination: Option<Destination>)->UpsertOutcome {
        match self.vehicles.entry( report.vehicle_id) {
            Entry::Occupied(mut e) => {
                let vs = e.get_mut();
                if report.timestamp < vs.last_update {
                    debug!("stale report for vehicle {} ({} < {})", vs.id, report.timestamp, vs.last_update);
                    UpsertOutcome::Stale
                } else {
                    vs.update( report);
                    if let Some(dest) = destination { vs.destination = dest }
                    UpsertOutcome::Updated
                }
            }
            Entry::Vacant(e) => {
                if let Some(dest) = destination {
                    info!("registered vehicle {} with destination {}", report.vehicle_id, dest);
                    e.insert( VehicleState::from_report( report, dest));
                    UpsertOutcome::Inserted
                } else {
                    UpsertOutcome::Ignored
                }
            }
        }
    }

    pub fn get (&self, id: VehicleId)->Option<VehicleState> {
        self.vehicles.get(&id).map( |e| e.value().clone())
    }

    pub fn contains (&self, id: VehicleId)->bool { self.vehicles.contains_key(&id) }

    pub fn len (&self)->usize { self.vehicles.len() }

    pub fn is_empty (&self)->bool { self.vehicles.is_empty() }

    /// sorted ids of all registered vehicles
    pub fn ids (&self)->Vec<VehicleId> {
        let mut ids: Vec<VehicleId> = self.vehicles.iter().map( |e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// point-in-time copy of all vehicle states. Each state is cloned under its shard lock so we never
    /// see partial updates. There is no atomicity across vehicles
    pub fn snapshot (&self)->RegistrySnapshot {
        let vehicles = self.vehicles.iter().map( |e| (*e.key(), e.value().clone())).collect();
        RegistrySnapshot { vehicles }
    }

    /// returns false if the vehicle is not known
    pub fn set_destination (&self, id: VehicleId, destination: Destination)->bool {
        if let Some(mut e) = self.vehicles.get_mut(&id) {
            e.destination = destination;
            true
        } else {
            false
        }
    }

    /// the vehicle has no reachable destination left. It keeps its last position and is not
    /// removed, but resolvers can exclude it from threat consideration
    pub fn mark_parked (&self, id: VehicleId)->bool {
        if let Some(mut e) = self.vehicles.get_mut(&id) {
            if !e.destination.is_parked() {
                info!("vehicle {} parked at {}", id, e.position);
            }
            e.destination = Destination::Parked;
            e.avoiding = false;
            true
        } else {
            false
        }
    }

    /// register a vehicle we only know as parked (first report while coordinator has nothing for it)
    pub fn insert_parked (&self, report: &TelemetryReport)->UpsertOutcome {
        if self.contains( report.vehicle_id) {
            let outcome = self.upsert( report, None);
            if outcome == UpsertOutcome::Updated { self.mark_parked( report.vehicle_id); }
            outcome
        } else {
            self.upsert( report, Some(Destination::Parked))
        }
    }

    /// returns the previous value, or None if the vehicle is not known
    pub fn set_avoiding (&self, id: VehicleId, avoiding: bool)->Option<bool> {
        self.vehicles.get_mut(&id).map( |mut e| {
            let was_avoiding = e.avoiding;
            e.avoiding = avoiding;
            was_avoiding
        })
    }

    pub fn last_update (&self, id: VehicleId)->Option<EpochMillis> {
        self.vehicles.get(&id).map( |e| e.last_update)
    }
}

/// immutable, id-ordered view of the registry at some point in time
#[derive(Debug,Clone,Default)]
pub struct RegistrySnapshot {
    vehicles: BTreeMap<VehicleId,VehicleState>,
}

impl RegistrySnapshot {
    pub fn get (&self, id: VehicleId)->Option<&VehicleState> { self.vehicles.get(&id) }

    pub fn iter (&self)->impl Iterator<Item=&VehicleState> { self.vehicles.values() }

    /// all vehicles except the given one
    pub fn others (&self, id: VehicleId)->impl Iterator<Item=&VehicleState> {
        self.vehicles.values().filter( move |vs| vs.id != id)
    }

    pub fn len (&self)->usize { self.vehicles.len() }

    pub fn is_empty (&self)->bool { self.vehicles.is_empty() }
}

impl FromIterator<VehicleState> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item=VehicleState>>(iter: I) -> Self {
        RegistrySnapshot { vehicles: iter.into_iter().map( |vs| (vs.id, vs)).collect() }
    }
}
