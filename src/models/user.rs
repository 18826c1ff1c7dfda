use serde::{Deserialize, Serialize};

use super::Route;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    SuperAdmin,
    TransportManager,
    OfficeAdmin,
    Attender,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::SuperAdmin => "super_admin",
            AppRole::TransportManager => "transport_manager",
            AppRole::OfficeAdmin => "office_admin",
            AppRole::Attender => "attender",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(AppRole::SuperAdmin),
            "transport_manager" => Some(AppRole::TransportManager),
            "office_admin" => Some(AppRole::OfficeAdmin),
            "attender" => Some(AppRole::Attender),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppRole::SuperAdmin => "Super Admin",
            AppRole::TransportManager => "Transport Manager",
            AppRole::OfficeAdmin => "Office Admin",
            AppRole::Attender => "Bus Attender",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub route_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub roles: Vec<AppRole>,
    #[serde(default)]
    pub assigned_bus: Option<Bus>,
    #[serde(default)]
    pub assigned_route: Option<Route>,
}

impl UserProfile {
    pub fn has_role(&self, role: AppRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Payload of a successful `POST /auth/verify-otp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSession {
    pub token: String,
    pub user: UserProfile,
}
