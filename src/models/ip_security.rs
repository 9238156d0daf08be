use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of IP changes kept per user; older entries are dropped first
pub const MAX_IP_HISTORY: usize = 10;

/// Message shown to the user when a login comes from an unknown IP
pub const IP_CHANGE_WARNING: &str =
    "IP address change detected. If this wasn't you, please change your password.";

/// One observed change of login IP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpChange {
    pub old_ip: String,
    pub new_ip: String,
    pub at: DateTime<Utc>,
}

/// Per-user IP tracking state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpSecurityRecord {
    /// IP the user has marked as trusted
    pub registered_ip: String,
    /// IP seen at the most recent check
    pub last_login_ip: String,
    pub last_login_at: DateTime<Utc>,
    /// Oldest first, at most `MAX_IP_HISTORY` entries
    #[serde(default)]
    pub change_history: Vec<IpChange>,
}

impl IpSecurityRecord {
    /// Record for a user seen for the first time from `ip`
    pub fn register(ip: &str, now: DateTime<Utc>) -> Self {
        Self {
            registered_ip: ip.to_string(),
            last_login_ip: ip.to_string(),
            last_login_at: now,
            change_history: Vec::new(),
        }
    }

    /// An IP is known when it matches either the last login or the trusted IP
    pub fn is_known_ip(&self, ip: &str) -> bool {
        ip == self.last_login_ip || ip == self.registered_ip
    }

    /// Move the last login to `new_ip` and append the change to the history
    pub fn record_change(&mut self, new_ip: &str, now: DateTime<Utc>) -> IpChange {
        let change = IpChange {
            old_ip: std::mem::replace(&mut self.last_login_ip, new_ip.to_string()),
            new_ip: new_ip.to_string(),
            at: now,
        };
        self.last_login_at = now;
        self.change_history.push(change.clone());

        if self.change_history.len() > MAX_IP_HISTORY {
            let excess = self.change_history.len() - MAX_IP_HISTORY;
            self.change_history.drain(..excess);
        }

        change
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_login_at = now;
    }

    /// Mark `ip` as trusted and as the latest login IP
    pub fn trust(&mut self, ip: &str) {
        self.registered_ip = ip.to_string();
        self.last_login_ip = ip.to_string();
    }
}

/// Warning surfaced to the user after a login from an unknown IP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpWarning {
    pub message: String,
    pub old_ip: String,
    pub new_ip: String,
}

/// Result of an IP check at login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpCheckOutcome {
    pub ip_changed: bool,
    pub warning: Option<IpWarning>,
}

impl IpCheckOutcome {
    pub fn unchanged() -> Self {
        Self {
            ip_changed: false,
            warning: None,
        }
    }

    pub fn changed(change: &IpChange) -> Self {
        Self {
            ip_changed: true,
            warning: Some(IpWarning {
                message: IP_CHANGE_WARNING.to_string(),
                old_ip: change.old_ip.clone(),
                new_ip: change.new_ip.clone(),
            }),
        }
    }
}
