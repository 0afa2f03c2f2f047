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

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize,Deserialize,Serializer,Deserializer};
use std::time::Duration;
use std::{fmt, ops};
use parse_duration::parse;

/// compact timestamp type. Millisecond resolution is more than enough for position reports and
/// it keeps the type `Copy` and dense
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub fn now ()->Self { EpochMillis( Utc::now().timestamp_millis()) }

    pub fn new(millis:i64)->Self { EpochMillis(millis) }

    pub fn millis(&self)->i64 { self.0 }

    /// elapsed time since `earlier`, saturating at zero if `earlier` is actually later
    pub fn duration_since (&self, earlier: EpochMillis)->Duration {
        if self.0 > earlier.0 { Duration::from_millis( (self.0 - earlier.0) as u64) } else { Duration::ZERO }
    }

    pub fn to_datetime (&self)->Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(date) => write!(f, "{}", date.to_rfc3339_opts( SecondsFormat::Millis, true)),
            None => write!(f, "EpochMillis({})", self.0)
        }
    }
}

impl ops::Add<Duration> for EpochMillis {
    type Output = EpochMillis;
    fn add (self, rhs: Duration)->EpochMillis { EpochMillis( self.0 + rhs.as_millis() as i64) }
}

#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn secs_f64 (n: f64)->Duration { Duration::from_secs_f64(n) }

//--- support for serde

/// parse durations from config strings such as "2s" or "500ms"
pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

/// the inverse of [`deserialize_duration`]
pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> Result<S::Ok, S::Error>  {
    s.serialize_str( &format!("{}ms", dur.as_millis()))
}
