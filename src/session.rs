use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Analyst,
    DataOperator,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(role: &str) -> Result<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "data_operator" => Ok(Role::DataOperator),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewForecasts,
    ViewActivity,
    UploadData,
    ManageMasterData,
    ManageUsers,
}

pub fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::Admin => &[
            Capability::ViewForecasts,
            Capability::ViewActivity,
            Capability::UploadData,
            Capability::ManageMasterData,
            Capability::ManageUsers,
        ],
        Role::Analyst => &[Capability::ViewForecasts, Capability::ViewActivity],
        Role::DataOperator => &[
            Capability::ViewForecasts,
            Capability::UploadData,
            Capability::ManageMasterData,
        ],
    }
}

/// Who is talking to the forecasting service. Passed explicitly to whatever
/// needs it.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: Option<String>,
    pub role: Role,
    pub token: Option<String>,
}

impl Session {
    pub fn new(role: Role) -> Self {
        Self {
            username: None,
            role,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        capabilities(self.role).contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("{:?}", capability)))
        }
    }
}
