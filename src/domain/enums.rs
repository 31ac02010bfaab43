// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//
//! Enum value types for §3/§4 of the Fleet data model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! lowercase_enum {
    ($name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str)),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant)),+,
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }
    };
}

lowercase_enum!(Browser {
    Chrome => "chrome",
    Firefox => "firefox",
    Edge => "edge",
    Safari => "safari",
});

lowercase_enum!(BrowserVersion {
    Latest => "latest",
    Stable => "stable",
    Canary => "canary",
    Dev => "dev",
});

lowercase_enum!(OperatingSystem {
    Windows => "windows",
    Macos => "macos",
    Linux => "linux",
});

lowercase_enum!(ProviderType {
    Docker => "docker",
    AzureContainerInstance => "azure_container_instance",
    AwsEcs => "aws_ecs",
    GcpCloudRun => "gcp_cloud_run",
    Kubernetes => "kubernetes",
});

impl Default for ProviderType {
    /// Docker is the only provider with a real backend (§9); it is the
    /// column default in the schema and the default for untyped pools/workers.
    fn default() -> Self {
        ProviderType::Docker
    }
}

lowercase_enum!(WorkPoolStatus {
    Active => "active",
    Paused => "paused",
    Error => "error",
    Maintenance => "maintenance",
});

// §9 Open Question: canonical WorkerStatus set is the six-value one; DRAINING
// is not modeled as a distinct status (maps to Online with capacity clamped
// to zero by the caller, per the spec's own suggestion).
lowercase_enum!(WorkerStatus {
    Offline => "offline",
    Online => "online",
    Busy => "busy",
    Error => "error",
    Starting => "starting",
    Stopping => "stopping",
});

impl WorkerStatus {
    /// Workers in these states may be handed sessions by the claim endpoint (§4.G step 1).
    pub fn is_claimable(self) -> bool {
        matches!(self, WorkerStatus::Online | WorkerStatus::Busy)
    }
}

/// Session status with the §4.B monotonic rank baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Starting,
    Running,
    Completed,
    Failed,
    Expired,
    Crashed,
    TimedOut,
    Terminated,
}

impl SessionStatus {
    /// §4.B: PENDING(0) < STARTING(1) < RUNNING(2) < all terminal statuses(3).
    pub fn rank(self) -> u8 {
        match self {
            SessionStatus::Pending => 0,
            SessionStatus::Starting => 1,
            SessionStatus::Running => 2,
            SessionStatus::Completed
            | SessionStatus::Failed
            | SessionStatus::Expired
            | SessionStatus::Crashed
            | SessionStatus::TimedOut
            | SessionStatus::Terminated => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 3
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Expired => "expired",
            SessionStatus::Crashed => "crashed",
            SessionStatus::TimedOut => "timed_out",
            SessionStatus::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SessionStatus::Pending),
            "starting" => Ok(SessionStatus::Starting),
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            "expired" => Ok(SessionStatus::Expired),
            "crashed" => Ok(SessionStatus::Crashed),
            "timed_out" => Ok(SessionStatus::TimedOut),
            "terminated" => Ok(SessionStatus::Terminated),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_round_trips_through_string() {
        assert_eq!("chrome".parse::<Browser>().unwrap(), Browser::Chrome);
        assert_eq!(Browser::Firefox.to_string(), "firefox");
        assert!("netscape".parse::<Browser>().is_err());
    }

    #[test]
    fn session_status_rank_is_monotonic_into_terminal() {
        assert!(SessionStatus::Pending.rank() < SessionStatus::Starting.rank());
        assert!(SessionStatus::Starting.rank() < SessionStatus::Running.rank());
        assert!(SessionStatus::Running.rank() < SessionStatus::Completed.rank());
        assert_eq!(SessionStatus::Completed.rank(), SessionStatus::Crashed.rank());
        assert!(SessionStatus::Crashed.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
    }

    #[test]
    fn worker_status_claimability() {
        assert!(WorkerStatus::Online.is_claimable());
        assert!(WorkerStatus::Busy.is_claimable());
        assert!(!WorkerStatus::Offline.is_claimable());
        assert!(!WorkerStatus::Error.is_claimable());
    }
}
