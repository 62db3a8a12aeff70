//! Account lifecycle: signup, login, profile maintenance and administration.
//!
//! Display ids are allocated inside the accounts collection's write lock: the number is the
//! count of existing accounts of the role plus one, bumped past any value already taken, so
//! ids stay unique even after deletions.

use super::require_role;
use crate::auth::{hash_password, verify_password};
use crate::config::CoreConfig;
use crate::constants::MAX_DISPLAY_NUMBER;
use crate::models::{
    format_display_id, Account, DoctorProfile, NurseProfile, PatientProfile, Role, RoleProfile,
    StaffProfile,
};
use crate::store::{Database, Snapshot};
use crate::validation::{self, optional_text, required_text};
use crate::{EmailAddress, HospitalError, HospitalResult, NonEmptyText, RecordId};
use api_shared::{ChangePasswordReq, ProfileFields, SignupReq, UpdateProfileReq};
use chrono::Utc;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AccountService {
    db: Arc<Database>,
    cfg: Arc<CoreConfig>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, cfg: Arc<CoreConfig>) -> Self {
        Self { db, cfg }
    }

    /// Self-service registration. Administrator accounts cannot be created this way.
    pub fn signup(&self, req: SignupReq) -> HospitalResult<Account> {
        let role: Role = validation::choice("role", &req.role)?;
        if role == Role::Admin {
            return Err(HospitalError::forbidden(
                "Administrator accounts can only be created by an administrator",
            ));
        }
        self.create(req, role)
    }

    /// Creates an account of any role, including administrators.
    pub fn create_account(&self, req: SignupReq) -> HospitalResult<Account> {
        let role: Role = validation::choice("role", &req.role)?;
        self.create(req, role)
    }

    fn create(&self, req: SignupReq, role: Role) -> HospitalResult<Account> {
        let email = validation::email("email", &req.email)?;
        validation::password("password", &req.password)?;
        let first_name = required_text("firstName", &req.first_name)?;
        let last_name = required_text("lastName", &req.last_name)?;
        let phone = validation::phone("phone", req.phone)?;
        let profile = build_profile(role, req.profile)?;

        // Hashing is slow; keep it outside the collection lock.
        let password_hash = hash_password(&req.password, self.cfg.password_iterations());
        let now = Utc::now();

        let account = self.db.accounts.insert_with(|existing| {
            if existing.any(|a| a.email == email) {
                return Err(HospitalError::Conflict(
                    "An account with this email already exists".into(),
                ));
            }

            Ok(Account {
                id: RecordId::new(),
                display_id: next_display_id(existing, role)?,
                email,
                password_hash,
                first_name,
                last_name,
                phone,
                is_active: true,
                profile,
                created_at: now,
                updated_at: now,
                last_login_at: None,
            })
        })?;

        tracing::info!(account = %account.id, display_id = %account.display_id, role = %role, "account created");
        Ok(account)
    }

    /// Checks credentials and records the login time.
    ///
    /// Unknown e-mail and wrong password produce the same error.
    pub fn authenticate(&self, email: &str, password: &str) -> HospitalResult<Account> {
        if email.trim().is_empty() {
            return Err(HospitalError::validation("email", "email is required"));
        }
        if password.is_empty() {
            return Err(HospitalError::validation("password", "password is required"));
        }

        let account = EmailAddress::parse(email)
            .ok()
            .and_then(|email| self.find_by_email(&email));
        let Some(account) = account else {
            tracing::info!("login failed: unknown email");
            return Err(HospitalError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(password, &account.password_hash) {
            tracing::info!(account = %account.id, "login failed: wrong password");
            return Err(HospitalError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        if !account.is_active {
            return Err(HospitalError::AccountDisabled);
        }

        self.db.accounts.update(&account.id, |a| {
            a.last_login_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Resolves the account behind a verified token subject.
    pub fn resolve_active(&self, subject: &str) -> HospitalResult<Account> {
        let account = RecordId::parse(subject)
            .ok()
            .and_then(|id| self.db.accounts.get(&id))
            .ok_or_else(|| HospitalError::Unauthorized("Account no longer exists".into()))?;
        if !account.is_active {
            return Err(HospitalError::AccountDisabled);
        }
        Ok(account)
    }

    pub fn get(&self, id: &RecordId) -> HospitalResult<Account> {
        self.db.accounts.get(id).ok_or(HospitalError::NotFound("Account"))
    }

    /// Account lookup for `GET /users/:id`. Patients may only see themselves and doctors.
    pub fn get_visible(&self, actor: &Account, id: &str) -> HospitalResult<Account> {
        let id = validation::record_id("id", id)?;
        let account = self.get(&id)?;
        if actor.role() == Role::Patient && account.id != actor.id && account.role() != Role::Doctor
        {
            return Err(HospitalError::forbidden(
                "You do not have access to this account",
            ));
        }
        Ok(account)
    }

    pub fn find_by_email(&self, email: &EmailAddress) -> Option<Account> {
        self.db.accounts.find_one(|a| &a.email == email)
    }

    /// All accounts, optionally of one role, oldest first.
    pub fn list(&self, role: Option<Role>) -> Vec<Account> {
        let mut accounts = self
            .db
            .accounts
            .find(|a| role.map_or(true, |r| a.role() == r));
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        accounts
    }

    pub fn list_patients(&self, actor: &Account) -> HospitalResult<Vec<Account>> {
        require_role(
            actor,
            &[Role::Doctor, Role::Nurse, Role::Admin, Role::Receptionist],
            "list patients",
        )?;
        Ok(self.list(Some(Role::Patient)))
    }

    /// Active doctors, for booking.
    pub fn list_doctors(&self) -> Vec<Account> {
        self.list(Some(Role::Doctor))
            .into_iter()
            .filter(|a| a.is_active)
            .collect()
    }

    pub fn update_profile(&self, id: &RecordId, req: UpdateProfileReq) -> HospitalResult<Account> {
        let first_name = req
            .first_name
            .as_deref()
            .map(|v| required_text("firstName", v))
            .transpose()?;
        let last_name = req
            .last_name
            .as_deref()
            .map(|v| required_text("lastName", v))
            .transpose()?;
        let phone = validation::phone("phone", req.phone)?;

        self.db.accounts.update(id, |account| {
            if let Some(first_name) = first_name {
                account.first_name = first_name;
            }
            if let Some(last_name) = last_name {
                account.last_name = last_name;
            }
            if phone.is_some() {
                account.phone = phone;
            }
            merge_profile(&mut account.profile, req.profile)?;
            account.updated_at = Utc::now();
            Ok(())
        })
    }

    pub fn change_password(&self, id: &RecordId, req: ChangePasswordReq) -> HospitalResult<()> {
        validation::password("newPassword", &req.new_password)?;
        let account = self.get(id)?;
        if !verify_password(&req.current_password, &account.password_hash) {
            return Err(HospitalError::validation(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let password_hash = hash_password(&req.new_password, self.cfg.password_iterations());
        self.db.accounts.update(id, |a| {
            a.password_hash = password_hash;
            a.updated_at = Utc::now();
            Ok(())
        })?;
        tracing::info!(account = %id, "password changed");
        Ok(())
    }

    /// Activates or deactivates an account. Administrators cannot deactivate themselves.
    pub fn set_active(&self, actor: &Account, id: &str, active: bool) -> HospitalResult<Account> {
        require_role(actor, &[Role::Admin], "change account status")?;
        let id = validation::record_id("id", id)?;
        if id == actor.id && !active {
            return Err(HospitalError::forbidden(
                "You cannot deactivate your own account",
            ));
        }

        let account = self.db.accounts.update(&id, |a| {
            a.is_active = active;
            a.updated_at = Utc::now();
            Ok(())
        })?;
        tracing::info!(account = %account.id, active, by = %actor.id, "account status changed");
        Ok(account)
    }

    pub fn delete(&self, actor: &Account, id: &str) -> HospitalResult<Account> {
        require_role(actor, &[Role::Admin], "delete accounts")?;
        let id = validation::record_id("id", id)?;
        if id == actor.id {
            return Err(HospitalError::forbidden("You cannot delete your own account"));
        }

        let removed = self.db.accounts.remove(&id)?;
        tracing::info!(account = %removed.id, by = %actor.id, "account deleted");
        Ok(removed)
    }
}

fn next_display_id(existing: &Snapshot<'_, Account>, role: Role) -> HospitalResult<String> {
    let used = u32::try_from(existing.count(|a| a.role() == role)).unwrap_or(u32::MAX);
    let number = next_free_number(used, MAX_DISPLAY_NUMBER, |n| {
        let candidate = format_display_id(role, n);
        existing.any(|a| a.display_id == candidate)
    })
    .ok_or_else(|| {
        tracing::error!(role = %role, "display id space exhausted");
        HospitalError::Conflict(format!("No display ids left for role {role}"))
    })?;
    Ok(format_display_id(role, number))
}

/// First number in `1..=max` not `taken`, searching from `used + 1` and wrapping round to
/// reuse gaps left by deleted accounts.
fn next_free_number(used: u32, max: u32, taken: impl Fn(u32) -> bool) -> Option<u32> {
    let start = used.saturating_add(1);
    (start..=max).chain(1..start.min(max + 1)).find(|&n| !taken(n))
}

fn build_profile(role: Role, fields: ProfileFields) -> HospitalResult<RoleProfile> {
    Ok(match role {
        Role::Patient => {
            let mut profile = PatientProfile::default();
            apply_patient_fields(&mut profile, fields)?;
            RoleProfile::Patient(profile)
        }
        Role::Doctor => RoleProfile::Doctor(DoctorProfile {
            specialization: required_text(
                "specialization",
                fields.specialization.as_deref().unwrap_or_default(),
            )?,
            license_number: required_text(
                "licenseNumber",
                fields.license_number.as_deref().unwrap_or_default(),
            )?,
            department: optional_text(fields.department),
            years_of_experience: fields.years_of_experience,
            consultation_fee: consultation_fee(fields.consultation_fee)?,
        }),
        Role::Nurse => RoleProfile::Nurse(NurseProfile {
            license_number: required_text(
                "licenseNumber",
                fields.license_number.as_deref().unwrap_or_default(),
            )?,
            department: optional_text(fields.department),
            shift: optional_text(fields.shift),
        }),
        Role::Admin => RoleProfile::Admin(StaffProfile {
            department: optional_text(fields.department),
        }),
        Role::Receptionist => RoleProfile::Receptionist(StaffProfile {
            department: optional_text(fields.department),
        }),
    })
}

/// Overlays the supplied fields on the existing profile. The role itself never changes.
fn merge_profile(profile: &mut RoleProfile, fields: ProfileFields) -> HospitalResult<()> {
    match profile {
        RoleProfile::Patient(p) => apply_patient_fields(p, fields)?,
        RoleProfile::Doctor(d) => {
            if let Some(v) = fields.specialization.as_deref() {
                d.specialization = required_text("specialization", v)?;
            }
            if let Some(v) = fields.license_number.as_deref() {
                d.license_number = required_text("licenseNumber", v)?;
            }
            if let Some(v) = optional_text(fields.department) {
                d.department = Some(v);
            }
            if fields.years_of_experience.is_some() {
                d.years_of_experience = fields.years_of_experience;
            }
            if let Some(fee) = consultation_fee(fields.consultation_fee)? {
                d.consultation_fee = Some(fee);
            }
        }
        RoleProfile::Nurse(n) => {
            if let Some(v) = fields.license_number.as_deref() {
                n.license_number = required_text("licenseNumber", v)?;
            }
            if let Some(v) = optional_text(fields.department) {
                n.department = Some(v);
            }
            if let Some(v) = optional_text(fields.shift) {
                n.shift = Some(v);
            }
        }
        RoleProfile::Admin(s) | RoleProfile::Receptionist(s) => {
            if let Some(v) = optional_text(fields.department) {
                s.department = Some(v);
            }
        }
    }
    Ok(())
}

fn apply_patient_fields(p: &mut PatientProfile, fields: ProfileFields) -> HospitalResult<()> {
    if let Some(dob) = optional_text(fields.date_of_birth) {
        let dob = validation::date("dateOfBirth", &dob)?;
        if dob > Utc::now().date_naive() {
            return Err(HospitalError::validation(
                "dateOfBirth",
                "Date of birth cannot be in the future",
            ));
        }
        p.date_of_birth = Some(dob);
    }
    if let Some(group) = optional_text(fields.blood_group) {
        p.blood_group = Some(validation::choice("bloodGroup", &group)?);
    }
    if let Some(v) = optional_text(fields.gender) {
        p.gender = Some(v);
    }
    if let Some(v) = optional_text(fields.address) {
        p.address = Some(v);
    }
    if let Some(v) = optional_text(fields.emergency_contact) {
        p.emergency_contact = Some(v);
    }
    if let Some(allergies) = fields.allergies {
        p.allergies = allergies
            .into_iter()
            .filter_map(|a| NonEmptyText::new(a).ok())
            .map(|a| a.as_str().to_string())
            .collect();
    }
    Ok(())
}

fn consultation_fee(fee: Option<f64>) -> HospitalResult<Option<f64>> {
    match fee {
        Some(f) if !f.is_finite() || f < 0.0 => Err(HospitalError::validation(
            "consultationFee",
            "consultationFee must be a non-negative amount",
        )),
        other => Ok(other),
    }
}
