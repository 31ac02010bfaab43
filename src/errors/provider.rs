// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Provider (container backend) error types

use std::fmt;

#[derive(Debug)]
pub enum ProviderError {
    ConnectionFailed(String),
    ContainerCreateFailed(String),
    ContainerStartFailed(String),
    ContainerStopFailed(String),
    NotFound(String),
    ImagePullFailed(String),
    ResourceLimitExceeded(String),
    /// Provider kind is a known `ProviderType` but has no real backend wired up.
    Unsupported(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::ConnectionFailed(msg) => write!(f, "provider connection failed: {}", msg),
            ProviderError::ContainerCreateFailed(msg) => {
                write!(f, "container creation failed: {}", msg)
            }
            ProviderError::ContainerStartFailed(msg) => write!(f, "container start failed: {}", msg),
            ProviderError::ContainerStopFailed(msg) => write!(f, "container stop failed: {}", msg),
            ProviderError::NotFound(id) => write!(f, "container not found: {}", id),
            ProviderError::ImagePullFailed(msg) => write!(f, "image pull failed: {}", msg),
            ProviderError::ResourceLimitExceeded(msg) => {
                write!(f, "resource limit exceeded: {}", msg)
            }
            ProviderError::Unsupported(kind) => {
                write!(f, "provider '{}' has no backend implementation", kind)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<bollard::errors::Error> for ProviderError {
    fn from(err: bollard::errors::Error) -> Self {
        ProviderError::ConnectionFailed(err.to_string())
    }
}
