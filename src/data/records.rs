//! Raw record shapes of the three upstream feeds.
//!
//! Field names follow the published JSON. Unknown fields (age group, sex, ...)
//! are ignored; absent or `null` counts read as zero downstream.

use serde::{Deserialize, Serialize};

/// One row of the cases feed (`COVID19BE_CASES_AGESEX`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasesRecord {
    #[serde(rename = "DATE", default)]
    pub date: Option<String>,
    #[serde(rename = "PROVINCE", default)]
    pub province: Option<String>,
    #[serde(rename = "REGION", default)]
    pub region: Option<String>,
    #[serde(rename = "CASES", default)]
    pub cases: Option<i64>,
}

/// One row of the hospitalisation feed (`COVID19BE_HOSP`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalRecord {
    #[serde(rename = "DATE", default)]
    pub date: Option<String>,
    #[serde(rename = "PROVINCE", default)]
    pub province: Option<String>,
    #[serde(rename = "REGION", default)]
    pub region: Option<String>,
    #[serde(rename = "TOTAL_IN", default)]
    pub total_in: Option<i64>,
    #[serde(rename = "TOTAL_IN_ICU", default)]
    pub total_in_icu: Option<i64>,
    #[serde(rename = "NEW_IN", default)]
    pub new_in: Option<i64>,
}

/// One row of the mortality feed (`COVID19BE_MORT`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    #[serde(rename = "DATE", default)]
    pub date: Option<String>,
    #[serde(rename = "REGION", default)]
    pub region: Option<String>,
    #[serde(rename = "DEATHS", default)]
    pub deaths: Option<i64>,
}

/// The three feeds as fetched in one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeeds {
    pub cases: Vec<CasesRecord>,
    pub hospital: Vec<HospitalRecord>,
    pub deaths: Vec<DeathRecord>,
}

impl RawFeeds {
    pub fn record_count(&self) -> usize {
        self.cases.len() + self.hospital.len() + self.deaths.len()
    }
}
