use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    scoped_futures::ScopedFutureExt,
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{LoginUpdate, NewUser, NewUserRow, Role, RoleRow, User, UserRow};
use crate::schema::{roles as roles_table, users as users_table};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

/// Build the connection pool. With `use_tls` off, diesel-async's default
/// plain-text setup is used (local development databases).
pub fn establish_connection_pool(database_url: &str, use_tls: bool) -> anyhow::Result<DbPool> {
    let config = if use_tls {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup =
            Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            database_url,
            manager_config,
        )
    } else {
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url)
    };
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

// Role database operations
pub mod roles {
    use super::*;
    use shared_types::RoleName;

    pub async fn find_by_name(
        conn: &mut AsyncPgConnection,
        role_name: RoleName,
    ) -> Result<Option<Role>, StoreError> {
        use roles_table::dsl::*;

        let row = roles
            .filter(name.eq(role_name.as_str()))
            .select(RoleRow::as_select())
            .first::<RoleRow>(conn)
            .await
            .optional()?;

        row.map(Role::try_from).transpose()
    }

    /// Insert the role unless one with the same name already exists.
    /// Returns whether a row was written.
    pub async fn insert_if_absent(
        conn: &mut AsyncPgConnection,
        role_name: RoleName,
        description_val: &str,
    ) -> Result<bool, StoreError> {
        use roles_table::dsl::*;

        let inserted = diesel::insert_into(roles)
            .values((name.eq(role_name.as_str()), description.eq(description_val)))
            .on_conflict(name)
            .do_nothing()
            .execute(conn)
            .await?;

        Ok(inserted == 1)
    }

    pub async fn list_all(conn: &mut AsyncPgConnection) -> Result<Vec<Role>, StoreError> {
        use roles_table::dsl::*;

        let rows = roles
            .order_by(name.asc())
            .select(RoleRow::as_select())
            .load::<RoleRow>(conn)
            .await?;

        rows.into_iter().map(Role::try_from).collect()
    }
}

// User database operations
pub mod users {
    use super::*;

    async fn role_for(conn: &mut AsyncPgConnection, user: UserRow) -> Result<User, StoreError> {
        let role = roles_table::table
            .find(user.role_id)
            .select(RoleRow::as_select())
            .first::<RoleRow>(conn)
            .await?;

        User::from_rows(user, role)
    }

    pub async fn get_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, StoreError> {
        let row = users_table::table
            .inner_join(roles_table::table)
            .filter(users_table::id.eq(user_id))
            .select((UserRow::as_select(), RoleRow::as_select()))
            .first::<(UserRow, RoleRow)>(conn)
            .await
            .optional()?;

        row.map(|(user, role)| User::from_rows(user, role))
            .transpose()
    }

    pub async fn get_by_google_id(
        conn: &mut AsyncPgConnection,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = users_table::table
            .inner_join(roles_table::table)
            .filter(users_table::google_id.eq(external_id))
            .select((UserRow::as_select(), RoleRow::as_select()))
            .first::<(UserRow, RoleRow)>(conn)
            .await
            .optional()?;

        row.map(|(user, role)| User::from_rows(user, role))
            .transpose()
    }

    pub async fn list_all(conn: &mut AsyncPgConnection) -> Result<Vec<User>, StoreError> {
        let rows = users_table::table
            .inner_join(roles_table::table)
            .order_by(users_table::created_at.asc())
            .select((UserRow::as_select(), RoleRow::as_select()))
            .load::<(UserRow, RoleRow)>(conn)
            .await?;

        rows.into_iter()
            .map(|(user, role)| User::from_rows(user, role))
            .collect()
    }

    /// Insert a new user. A second insert for the same `google_id` fails with
    /// `StoreError::Duplicate`. The insert and the role read share a
    /// transaction, so a failure leaves no row behind.
    pub async fn create(conn: &mut AsyncPgConnection, new: &NewUser) -> Result<User, StoreError> {
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let row = diesel::insert_into(users_table::table)
                    .values(NewUserRow {
                        google_id: &new.google_id,
                        email: &new.email,
                        display_name: &new.display_name,
                        picture_url: new.picture_url.as_deref(),
                        role_id: new.role_id,
                        last_login: new.last_login,
                    })
                    .returning(UserRow::as_returning())
                    .get_result::<UserRow>(conn)
                    .await?;

                role_for(conn, row).await
            }
            .scope_boxed()
        })
        .await
    }

    /// Refresh the login fields. Rolled back if the role read fails.
    pub async fn record_login(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        update: &LoginUpdate,
    ) -> Result<User, StoreError> {
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                use users_table::dsl::*;

                let row = diesel::update(users.filter(id.eq(user_id)))
                    .set((
                        display_name.eq(update.display_name.as_str()),
                        picture_url.eq(update.picture_url.as_deref()),
                        last_login.eq(update.last_login),
                    ))
                    .returning(UserRow::as_returning())
                    .get_result::<UserRow>(conn)
                    .await?;

                role_for(conn, row).await
            }
            .scope_boxed()
        })
        .await
    }
}
