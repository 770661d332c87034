use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::str::FromStr;

/// Who a permission applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionTarget {
    User(String),
    Group(String),
    Domain(String),
    Anyone,
}

impl PermissionTarget {
    /// The service's `type` field for this target.
    #[must_use]
    pub fn type_str(&self) -> &'static str {
        match self {
            PermissionTarget::User(_) => "user",
            PermissionTarget::Group(_) => "group",
            PermissionTarget::Domain(_) => "domain",
            PermissionTarget::Anyone => "anyone",
        }
    }

    /// The e-mail address for user/group targets.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            PermissionTarget::User(email) | PermissionTarget::Group(email) => Some(email),
            _ => None,
        }
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            PermissionTarget::Domain(domain) => Some(domain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Owner,
    Writer,
    #[default]
    Reader,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Writer => "writer",
            Role::Reader => "reader",
        }
    }
}

/// A parsed sharing rule.
///
/// The compact string form is
/// `<id>|(<group>)|(<role>)|(<notify>)|(<require_link>)`:
///
/// - `<id>` — e-mail address, domain, or `anyone`
/// - `group`/`grp` — the id is a group e-mail
/// - `owner`/`writer`/`reader` — role, `reader` when omitted
/// - `no`/`false` — don't notify the grantee
/// - `link` — require the grantee to have the link
///
/// So `admins@example.com|grp|owner|false|link` shares ownership with a
/// group, silently, link-required; a bare `anyone` grants public read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub target: PermissionTarget,
    pub role: Role,
    pub notify: bool,
    pub with_link: bool,
}

impl FromStr for Permission {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('|').map(str::trim);
        let id = parts
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::InvalidPermission(s.to_string()))?;

        let mut is_group = false;
        let mut role = Role::default();
        let mut notify = true;
        let mut with_link = false;

        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "group" | "grp" => is_group = true,
                "owner" => role = Role::Owner,
                "writer" => role = Role::Writer,
                "reader" => role = Role::Reader,
                "no" | "false" => notify = false,
                "link" => with_link = true,
                _ => return Err(ClientError::InvalidPermission(s.to_string())),
            }
        }

        let target = if id.eq_ignore_ascii_case("anyone") {
            PermissionTarget::Anyone
        } else if id.contains('@') {
            if is_group {
                PermissionTarget::Group(id.to_string())
            } else {
                PermissionTarget::User(id.to_string())
            }
        } else {
            PermissionTarget::Domain(id.to_string())
        };

        Ok(Permission {
            target,
            role,
            notify,
            with_link,
        })
    }
}

/// A permission as reported back by the service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub role: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}
