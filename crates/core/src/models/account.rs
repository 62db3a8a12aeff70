use crate::constants::ACCOUNTS_COLLECTION;
use crate::store::Document;
use crate::{EmailAddress, NonEmptyText, RecordId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Nurse,
    Admin,
    Receptionist,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Patient,
        Role::Doctor,
        Role::Nurse,
        Role::Admin,
        Role::Receptionist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
            Role::Receptionist => "receptionist",
        }
    }

    /// Prefix of the human-facing display id.
    pub fn display_prefix(self) -> &'static str {
        match self {
            Role::Patient => "PAT",
            Role::Doctor => "DOC",
            Role::Nurse => "NUR",
            Role::Admin => "ADM",
            Role::Receptionist => "REC",
        }
    }

    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Patient)
    }

    /// Roles that may order tests and read clinical results.
    pub fn is_clinical(self) -> bool {
        matches!(self, Role::Doctor | Role::Nurse | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Formats a display id such as `PAT000042`.
pub fn format_display_id(role: Role, number: u32) -> String {
    format!("{}{:06}", role.display_prefix(), number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl FromStr for BloodGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "A+" => BloodGroup::APositive,
            "A-" => BloodGroup::ANegative,
            "B+" => BloodGroup::BPositive,
            "B-" => BloodGroup::BNegative,
            "AB+" => BloodGroup::AbPositive,
            "AB-" => BloodGroup::AbNegative,
            "O+" => BloodGroup::OPositive,
            "O-" => BloodGroup::ONegative,
            _ => return Err(format!("unknown blood group: {s}")),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    #[schema(value_type = String)]
    pub specialization: NonEmptyText,
    #[schema(value_type = String)]
    pub license_number: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NurseProfile {
    #[schema(value_type = String)]
    pub license_number: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Role plus the fields that only make sense for that role.
///
/// Serialised flat into the account with `role` as the tag, so a doctor reads as
/// `{"role": "doctor", "specialization": ..., "licenseNumber": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
    Nurse(NurseProfile),
    Admin(StaffProfile),
    Receptionist(StaffProfile),
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Patient(_) => Role::Patient,
            RoleProfile::Doctor(_) => Role::Doctor,
            RoleProfile::Nurse(_) => Role::Nurse,
            RoleProfile::Admin(_) => Role::Admin,
            RoleProfile::Receptionist(_) => Role::Receptionist,
        }
    }
}

/// Stored account, including the password hash. Never serialised into an API response;
/// use [`AccountView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: RecordId,
    pub display_id: String,
    pub email: EmailAddress,
    pub password_hash: String,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub profile: RoleProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }
}

impl Document for Account {
    const COLLECTION: &'static str = ACCOUNTS_COLLECTION;
    const KIND: &'static str = "Account";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Public projection of an account.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[schema(value_type = String)]
    pub id: RecordId,
    pub display_id: String,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    #[schema(value_type = String)]
    pub first_name: NonEmptyText,
    #[schema(value_type = String)]
    pub last_name: NonEmptyText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub profile: RoleProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountView {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            display_id: a.display_id.clone(),
            email: a.email.clone(),
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            phone: a.phone.clone(),
            is_active: a.is_active,
            profile: a.profile.clone(),
            created_at: a.created_at,
            updated_at: a.updated_at,
            last_login_at: a.last_login_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor() -> Account {
        let now = Utc::now();
        Account {
            id: RecordId::new(),
            display_id: format_display_id(Role::Doctor, 7),
            email: EmailAddress::parse("house@ppth.org").unwrap(),
            password_hash: "pbkdf2-sha256$1000$c2FsdA$aGFzaA".into(),
            first_name: NonEmptyText::new("Gregory").unwrap(),
            last_name: NonEmptyText::new("House").unwrap(),
            phone: None,
            is_active: true,
            profile: RoleProfile::Doctor(DoctorProfile {
                specialization: NonEmptyText::new("Diagnostics").unwrap(),
                license_number: NonEmptyText::new("NJ-1234").unwrap(),
                department: None,
                years_of_experience: Some(20),
                consultation_fee: None,
            }),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn display_id_is_prefixed_and_padded() {
        assert_eq!(format_display_id(Role::Patient, 1), "PAT000001");
        assert_eq!(format_display_id(Role::Receptionist, 123456), "REC123456");
    }

    #[test]
    fn profile_is_flattened_with_role_tag() {
        let json = serde_json::to_value(doctor()).unwrap();
        assert_eq!(json["role"], "doctor");
        assert_eq!(json["specialization"], "Diagnostics");
        assert_eq!(json["licenseNumber"], "NJ-1234");

        let back: Account = serde_json::from_value(json).unwrap();
        assert_eq!(back.role(), Role::Doctor);
    }

    #[test]
    fn view_omits_password_hash() {
        let json = serde_json::to_value(doctor().view()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["displayId"], "DOC000007");
    }

    #[test]
    fn blood_group_round_trips_in_clinical_notation() {
        assert_eq!("ab-".parse::<BloodGroup>().unwrap(), BloodGroup::AbNegative);
        assert_eq!(
            serde_json::to_value(BloodGroup::OPositive).unwrap(),
            serde_json::json!("O+")
        );
        assert!("C+".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert!("surgeon".parse::<Role>().is_err());
    }
}
