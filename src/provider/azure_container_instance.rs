// BSD 3-Clause License
// Copyright (c) 2025, Fleet Maintainers
//! Azure Container Instances backend — no SDK wired up yet (§9 Open Question).

use async_trait::async_trait;

use super::{ContainerStatus, LaunchResult, Provider, WorkerStats};
use crate::domain::Session;
use crate::errors::ProviderError;

pub struct AzureContainerInstanceProvider;

#[async_trait]
impl Provider for AzureContainerInstanceProvider {
    async fn start(&self) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn launch_container(&self, _session: &Session) -> Result<LaunchResult, ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn terminate_container(&self, _container_id: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn get_container_status(&self, _container_id: &str) -> Result<ContainerStatus, ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn get_container_logs(&self, _container_id: &str, _lines: i64) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn get_worker_stats(&self) -> Result<WorkerStats, ProviderError> {
        Err(ProviderError::Unsupported("azure_container_instance".into()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}
