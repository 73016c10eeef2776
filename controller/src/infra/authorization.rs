//! Infrastructure implementation of the `AuthorizationSource` port backed by
//! the `access` section of the controller config.

use anyhow::Result;

use crate::application::ports::AuthorizationSource;
use crate::domain::{AccessConfig, RegionGrant};

/// Static user → region grants read from configuration.
pub struct StaticAuthorization {
    access: AccessConfig,
}

impl StaticAuthorization {
    #[must_use]
    pub fn new(access: AccessConfig) -> Self {
        Self { access }
    }
}

impl AuthorizationSource for StaticAuthorization {
    async fn regions_for(&self, user: &str) -> Result<Option<RegionGrant>> {
        Ok(self.access.grant_for(user))
    }
}
