//! Role-based permission checks.
//!
//! The engine itself never checks permissions. Callers consult an
//! [`Authorizer`] before each class of operation.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::types::*;

/// Roles, from least to most privileged.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Observer,
    Operator,
    Admin,
}

impl FromStr for Role {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "observer" => Ok(Role::Observer),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            _ => UnknownRoleSnafu { name: s }.fail(),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Observer => "observer",
            Role::Operator => "operator",
            Role::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Action {
    ViewReports,
    ManageEntities,
    RegisterVotes,
    FinalizeRecord,
    FinalizeElection,
}

impl Action {
    /// The least privileged role allowed to perform the action.
    pub fn required_role(self) -> Role {
        match self {
            Action::ViewReports => Role::Observer,
            Action::ManageEntities => Role::Operator,
            Action::RegisterVotes => Role::Operator,
            Action::FinalizeRecord => Role::Operator,
            Action::FinalizeElection => Role::Admin,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::ViewReports => "view reports",
            Action::ManageEntities => "manage entities",
            Action::RegisterVotes => "register votes",
            Action::FinalizeRecord => "finalize records",
            Action::FinalizeElection => "finalize elections",
        };
        write!(f, "{}", s)
    }
}

pub trait Authorizer {
    fn is_allowed(&self, role: Role, action: Action) -> bool;
}

/// Each role can do everything the roles below it can do.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct RoleHierarchy;

impl Authorizer for RoleHierarchy {
    fn is_allowed(&self, role: Role, action: Action) -> bool {
        role >= action.required_role()
    }
}
