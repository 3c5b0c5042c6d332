//! Granular permission registry.
//!
//! Permissions are a closed enum so call sites are checked at compile
//! time. Grades persist them as an open JSON map (`{"view_patients": true}`);
//! keys this build does not know are kept verbatim in `PermissionSet` so a
//! grade written by a newer build survives a round-trip through this one.
//!
//! Adding a permission: add a line to `permission_registry!`, bump
//! `PERMISSION_REGISTRY_VERSION`. Stored grades need no migration: the new
//! key is simply absent (false) until an administrator grants it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bumped whenever a permission is added to the registry.
pub const PERMISSION_REGISTRY_VERSION: u32 = 1;

/// Generates the permission enum with its key, label and UI category.
macro_rules! permission_registry {
    ($($variant:ident => $key:literal, $label:literal, $category:literal;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Permission {
            $($variant),+
        }

        impl Permission {
            /// Every registered permission, in display order.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            /// Key stored in a grade's permission map.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn category(self) -> &'static str {
                match self {
                    $(Self::$variant => $category),+
                }
            }
        }

        impl std::str::FromStr for Permission {
            type Err = UnknownPermission;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    _ => Err(UnknownPermission(s.to_string())),
                }
            }
        }
    };
}

permission_registry! {
    AccessDashboard => "access_dashboard", "MDT access", "base";
    ViewPatients => "view_patients", "View patients", "patients";
    CreatePatients => "create_patients", "Create/edit patients", "patients";
    DeletePatients => "delete_patients", "Delete patients", "patients";
    CreateReports => "create_reports", "Create reports", "reports";
    DeleteReports => "delete_reports", "Delete reports", "reports";
    ManageAppointments => "manage_appointments", "Manage appointments", "appointments";
    DeleteAppointments => "delete_appointments", "Delete appointments", "appointments";
    ViewRoster => "view_roster", "View roster", "roster";
    ManageUsers => "manage_users", "Manage users", "admin";
    DeleteUsers => "delete_users", "Delete users", "admin";
    ManageGrades => "manage_grades", "Manage grades", "admin";
    ViewLogs => "view_logs", "View logs/stats", "admin";
}

impl Permission {
    /// Permissions that open the administration panel.
    pub const ADMIN_PANEL: &'static [Permission] = &[
        Permission::ManageUsers,
        Permission::DeleteUsers,
        Permission::ManageGrades,
        Permission::ViewLogs,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission: {0}")]
pub struct UnknownPermission(pub String);

/// Registry entry exposed to clients building permission editors.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub category: &'static str,
}

/// The full registry, in display order.
pub fn permission_registry() -> Vec<PermissionInfo> {
    Permission::ALL
        .iter()
        .map(|p| PermissionInfo {
            key: p.as_str(),
            label: p.label(),
            category: p.category(),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// PermissionSet
// ═══════════════════════════════════════════════════════════

/// Permissions granted by one grade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: BTreeSet<Permission>,
    /// Keys outside the registry, as stored.
    unrecognized: BTreeMap<String, bool>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registered permission.
    pub fn all() -> Self {
        Permission::ALL.iter().copied().collect()
    }

    pub fn grant(&mut self, permission: Permission) {
        self.granted.insert(permission);
    }

    pub fn revoke(&mut self, permission: Permission) {
        self.granted.remove(&permission);
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    /// Look up a raw key: registered keys by grant, others by stored value.
    pub fn contains_key(&self, key: &str) -> bool {
        match key.parse::<Permission>() {
            Ok(permission) => self.contains(permission),
            Err(_) => self.unrecognized.get(key).copied().unwrap_or(false),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.granted.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn unrecognized(&self) -> &BTreeMap<String, bool> {
        &self.unrecognized
    }

    /// Build from the stored JSON map. Only a literal `true` grants.
    pub fn from_map(map: BTreeMap<String, Value>) -> Self {
        let mut set = Self::new();
        for (key, value) in map {
            let enabled = matches!(value, Value::Bool(true));
            match key.parse::<Permission>() {
                Ok(permission) if enabled => set.grant(permission),
                Ok(_) => {}
                Err(_) => {
                    if let Value::Bool(flag) = value {
                        tracing::debug!(key = %key, "Keeping unregistered permission key");
                        set.unrecognized.insert(key, flag);
                    }
                }
            }
        }
        set
    }

    /// Parse the JSON text stored in the `grades.permissions` column.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
            unrecognized: BTreeMap::new(),
        }
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.granted.len() + self.unrecognized.len()))?;
        for permission in &self.granted {
            map.serialize_entry(permission.as_str(), &true)?;
        }
        for (key, value) in &self.unrecognized {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
        Ok(map.map(Self::from_map).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_round_trip_through_from_str() {
        for &permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(permission));
        }
        assert_eq!(
            "fly_helicopter".parse::<Permission>(),
            Err(UnknownPermission("fly_helicopter".into()))
        );
    }

    #[test]
    fn registry_lists_every_permission_once() {
        let registry = permission_registry();
        assert_eq!(registry.len(), 13);
        let keys: BTreeSet<_> = registry.iter().map(|p| p.key).collect();
        assert_eq!(keys.len(), 13);
        assert_eq!(registry[0].key, "access_dashboard");
        assert_eq!(registry[0].category, "base");
    }

    #[test]
    fn only_literal_true_grants() {
        let set: PermissionSet = serde_json::from_value(json!({
            "view_patients": true,
            "create_patients": false,
            "delete_patients": "true",
            "view_roster": 1
        }))
        .unwrap();
        assert!(set.contains(Permission::ViewPatients));
        assert!(!set.contains(Permission::CreatePatients));
        assert!(!set.contains(Permission::DeletePatients));
        assert!(!set.contains(Permission::ViewRoster));
    }

    #[test]
    fn unregistered_keys_survive_round_trip() {
        let set: PermissionSet = serde_json::from_value(json!({
            "view_logs": true,
            "dispatch_helicopter": true,
            "legacy_flag": false
        }))
        .unwrap();
        assert!(set.contains_key("dispatch_helicopter"));
        assert!(!set.contains_key("legacy_flag"));
        assert!(!set.contains_key("never_seen"));

        let back = serde_json::to_value(&set).unwrap();
        assert_eq!(
            back,
            json!({ "view_logs": true, "dispatch_helicopter": true, "legacy_flag": false })
        );
    }

    #[test]
    fn null_map_is_empty_set() {
        let set: PermissionSet = serde_json::from_value(json!(null)).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn all_contains_every_permission() {
        let set = PermissionSet::all();
        assert!(Permission::ALL.iter().all(|&p| set.contains(p)));
    }

    #[test]
    fn grant_and_revoke() {
        let mut set = PermissionSet::new();
        set.grant(Permission::ManageGrades);
        assert!(set.contains_key("manage_grades"));
        set.revoke(Permission::ManageGrades);
        assert!(!set.contains(Permission::ManageGrades));
    }
}
