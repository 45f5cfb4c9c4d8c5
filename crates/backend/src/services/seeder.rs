//! Startup seeding of reference data.

use shared_types::RoleName;

use crate::error::StoreError;
use crate::repository::RoleRepository;

/// Ensure every family role exists. Safe to run on every start; returns the
/// number of roles that had to be created.
pub async fn seed_roles(roles: &dyn RoleRepository) -> Result<usize, StoreError> {
    let mut created = 0;

    for role in RoleName::ALL {
        if roles.insert_if_absent(role, role.description()).await? {
            tracing::info!("Role created: {}", role);
            created += 1;
        } else {
            tracing::info!("Role already exists: {}", role);
        }
    }

    Ok(created)
}
