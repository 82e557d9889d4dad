//! Access guard.
//!
//! Every read and write of an appointment, diagnosis or prescription, and every
//! practice summary, is checked against [`RULES`], a single role × resource ×
//! action matrix. A rule either grants the action on any record
//! ([`Reach::Any`]) or only on records the caller is party to
//! ([`Reach::Own`]). Anything not listed is forbidden.
//!
//! Callers must load the target record first and report a missing record as
//! `NotFound` before consulting the guard, so that a forbidden lookup never
//! reveals whether the record exists through a different error.

use crate::error::{ClinicError, Result};
use crate::models::{Appointment, Diagnosis, Prescription, Role};
use std::fmt;

/// The authenticated party making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

impl Caller {
    pub const fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Appointment,
    Diagnosis,
    Prescription,
    /// A doctor's practice summary, derived from their own records.
    Analytics,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Appointment => "appointment",
            Resource::Diagnosis => "diagnosis",
            Resource::Prescription => "prescription",
            Resource::Analytics => "analytics",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    UpdateStatus,
    Cancel,
    Delete,
    Download,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Read => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::UpdateStatus => "change the status of",
            Action::Cancel => "cancel",
            Action::Delete => "delete",
            Action::Download => "download",
        })
    }
}

/// How far a rule extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    /// Only records the caller is party to in their role.
    Own,
    /// Every record of the resource.
    Any,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    role: Role,
    resource: Resource,
    action: Action,
    reach: Reach,
}

const fn rule(role: Role, resource: Resource, action: Action, reach: Reach) -> Rule {
    Rule {
        role,
        resource,
        action,
        reach,
    }
}

use Action::*;
use Reach::*;

/// The complete permission matrix.
///
/// Receptionists and admins have no prescription access at all, while both may
/// read every appointment and diagnosis.
const RULES: &[Rule] = &[
    // patient
    rule(Role::Patient, Resource::Appointment, Read, Own),
    rule(Role::Patient, Resource::Appointment, Create, Own),
    rule(Role::Patient, Resource::Appointment, Cancel, Own),
    rule(Role::Patient, Resource::Diagnosis, Read, Own),
    rule(Role::Patient, Resource::Prescription, Read, Own),
    rule(Role::Patient, Resource::Prescription, Download, Own),
    // doctor
    rule(Role::Doctor, Resource::Appointment, Read, Own),
    rule(Role::Doctor, Resource::Appointment, Cancel, Own),
    rule(Role::Doctor, Resource::Appointment, UpdateStatus, Own),
    rule(Role::Doctor, Resource::Diagnosis, Read, Own),
    rule(Role::Doctor, Resource::Diagnosis, Create, Own),
    rule(Role::Doctor, Resource::Diagnosis, Update, Own),
    rule(Role::Doctor, Resource::Prescription, Read, Own),
    rule(Role::Doctor, Resource::Prescription, Create, Own),
    rule(Role::Doctor, Resource::Prescription, Update, Own),
    rule(Role::Doctor, Resource::Prescription, Delete, Own),
    rule(Role::Doctor, Resource::Analytics, Read, Own),
    // receptionist
    rule(Role::Receptionist, Resource::Appointment, Read, Any),
    rule(Role::Receptionist, Resource::Appointment, Create, Any),
    rule(Role::Receptionist, Resource::Appointment, Cancel, Own),
    rule(Role::Receptionist, Resource::Diagnosis, Read, Any),
    // admin
    rule(Role::Admin, Resource::Appointment, Read, Any),
    rule(Role::Admin, Resource::Diagnosis, Read, Any),
];

/// The parties attached to a clinical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub receptionist_id: Option<i64>,
}

impl Ownership {
    fn includes(&self, caller: &Caller) -> bool {
        match caller.role {
            Role::Patient => self.patient_id == caller.id,
            Role::Doctor => self.doctor_id == caller.id,
            Role::Receptionist => self.receptionist_id == Some(caller.id),
            Role::Admin => false,
        }
    }
}

/// Records that carry an [`Ownership`].
pub trait Owned {
    fn ownership(&self) -> Ownership;
}

impl Owned for Appointment {
    fn ownership(&self) -> Ownership {
        Ownership {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            receptionist_id: self.receptionist_id,
        }
    }
}

impl Owned for Diagnosis {
    fn ownership(&self) -> Ownership {
        Ownership {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            receptionist_id: None,
        }
    }
}

impl Owned for Prescription {
    fn ownership(&self) -> Ownership {
        Ownership {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            receptionist_id: None,
        }
    }
}

fn reach_of(role: Role, resource: Resource, action: Action) -> Option<Reach> {
    RULES
        .iter()
        .find(|r| r.role == role && r.resource == resource && r.action == action)
        .map(|r| r.reach)
}

/// Whether `caller` may perform `action` on a record with `ownership`.
pub fn permits(
    caller: &Caller,
    resource: Resource,
    action: Action,
    ownership: &Ownership,
) -> bool {
    match reach_of(caller.role, resource, action) {
        Some(Any) => true,
        Some(Own) => ownership.includes(caller),
        None => false,
    }
}

/// Like [`permits`], reporting a refusal as [`ClinicError::Forbidden`].
pub fn authorize(
    caller: &Caller,
    resource: Resource,
    action: Action,
    ownership: &Ownership,
) -> Result<()> {
    if permits(caller, resource, action, ownership) {
        Ok(())
    } else {
        tracing::warn!(
            caller = caller.id,
            role = %caller.role,
            %resource,
            ?action,
            "access denied"
        );
        Err(ClinicError::forbidden(format!(
            "You are not permitted to {action} this {resource}"
        )))
    }
}

/// Which records a listing returns for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Patient(i64),
    Doctor(i64),
    All,
}

/// Derives the listing scope from the caller's `Read` rule on `resource`.
pub fn list_scope(caller: &Caller, resource: Resource) -> Result<ListScope> {
    match (reach_of(caller.role, resource, Read), caller.role) {
        (Some(Any), _) => Ok(ListScope::All),
        (Some(Own), Role::Patient) => Ok(ListScope::Patient(caller.id)),
        (Some(Own), Role::Doctor) => Ok(ListScope::Doctor(caller.id)),
        _ => Err(ClinicError::forbidden(format!(
            "A {} cannot list {resource} records",
            caller.role
        ))),
    }
}
