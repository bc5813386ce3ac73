//! Departments that can act as the sender account of a chirp.
//!
//! A department picks the icon of the chirp: the host resolves it to the sender
//! account whose prefab carries the matching name.

use crate::error::ChirpError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepartmentAccount {
    Electricity,
    FireRescue,
    Roads,
    Water,
    Communications,
    Police,
    PropertyAssessmentOffice,
    Post,
    BusinessNews,
    CensusBureau,
    ParkAndRec,
    EnvironmentalProtectionAgency,
    Healthcare,
    LivingStandardsAssociation,
    Garbage,
    TourismBoard,
    Transportation,
    Education,
}

impl DepartmentAccount {
    pub const ALL: [DepartmentAccount; 18] = [
        DepartmentAccount::Electricity,
        DepartmentAccount::FireRescue,
        DepartmentAccount::Roads,
        DepartmentAccount::Water,
        DepartmentAccount::Communications,
        DepartmentAccount::Police,
        DepartmentAccount::PropertyAssessmentOffice,
        DepartmentAccount::Post,
        DepartmentAccount::BusinessNews,
        DepartmentAccount::CensusBureau,
        DepartmentAccount::ParkAndRec,
        DepartmentAccount::EnvironmentalProtectionAgency,
        DepartmentAccount::Healthcare,
        DepartmentAccount::LivingStandardsAssociation,
        DepartmentAccount::Garbage,
        DepartmentAccount::TourismBoard,
        DepartmentAccount::Transportation,
        DepartmentAccount::Education,
    ];

    /// Prefab name of the sender account for this department.
    pub fn prefab_name(self) -> &'static str {
        match self {
            DepartmentAccount::Electricity => "ElectricityChirperAccount",
            DepartmentAccount::FireRescue => "FireRescueChirperAccount",
            DepartmentAccount::Roads => "RoadChirperAccount",
            DepartmentAccount::Water => "WaterChirperAccount",
            DepartmentAccount::Communications => "CommunicationsChirperAccount",
            DepartmentAccount::Police => "PoliceChirperAccount",
            DepartmentAccount::PropertyAssessmentOffice => "PropertyAssessmentOfficeAccount",
            DepartmentAccount::Post => "PostChirperAccount",
            DepartmentAccount::BusinessNews => "BusinessNewsChirperAccount",
            DepartmentAccount::CensusBureau => "CensusBureauChirperAccount",
            DepartmentAccount::ParkAndRec => "ParkAndRecChirperAccount",
            DepartmentAccount::EnvironmentalProtectionAgency => {
                "EnvironmentalProtectionAgencyChirperAccount"
            }
            DepartmentAccount::Healthcare => "HealthcareChirperAccount",
            DepartmentAccount::LivingStandardsAssociation => {
                "LivingStandardsAssociationChirperAccount"
            }
            DepartmentAccount::Garbage => "GarbageChirperAccount",
            DepartmentAccount::TourismBoard => "TourismBoardChirperAccount",
            DepartmentAccount::Transportation => "TransportationChirperAccount",
            DepartmentAccount::Education => "EducationChirperAccount",
        }
    }
}

impl std::fmt::Display for DepartmentAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for DepartmentAccount {
    type Err = ChirpError;

    /// Parses a department name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DepartmentAccount::ALL
            .into_iter()
            .find(|department| department.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChirpError::UnknownDepartment(s.to_string()))
    }
}
