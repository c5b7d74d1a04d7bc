use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};
use uuid::Uuid;

stored_object!(User, "user", {
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    api_key: Option<String>
});

impl User {
    /// Register a user. The password is hashed with argon2 inside the database.
    pub async fn create_new(
        name: String,
        email: String,
        password: String,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".into(),
            ));
        }

        if Self::find_by_email(&email, db).await?.is_some() {
            return Err(AppError::Validation("Email is already registered".into()));
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let user: Option<User> = db
            .client
            .query(
                "CREATE type::thing('user', $id) SET
                name = $name,
                email = $email,
                password = crypto::argon2::generate($password),
                api_key = NONE,
                created_at = $created_at,
                updated_at = $updated_at",
            )
            .bind(("id", id))
            .bind(("name", name))
            .bind(("email", email))
            .bind(("password", password))
            .bind(("created_at", surrealdb::Datetime::from(now)))
            .bind(("updated_at", surrealdb::Datetime::from(now)))
            .await?
            .take(0)?;

        user.ok_or(AppError::Auth("User failed to create".into()))
    }

    pub async fn authenticate(
        email: &str,
        password: &str,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let user: Option<User> = db
            .client
            .query(
                "SELECT * FROM user
                WHERE email = $email
                AND crypto::argon2::compare(password, $password)",
            )
            .bind(("email", email.to_owned()))
            .bind(("password", password.to_owned()))
            .await?
            .take(0)?;
        user.ok_or(AppError::Auth("Invalid email or password".into()))
    }

    pub async fn find_by_email(
        email: &str,
        db: &SurrealDbClient,
    ) -> Result<Option<Self>, AppError> {
        let user: Option<User> = db
            .client
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await?
            .take(0)?;

        Ok(user)
    }

    pub async fn find_by_api_key(
        api_key: &str,
        db: &SurrealDbClient,
    ) -> Result<Option<Self>, AppError> {
        let user: Option<User> = db
            .client
            .query("SELECT * FROM user WHERE api_key = $api_key LIMIT 1")
            .bind(("api_key", api_key.to_string()))
            .await?
            .take(0)?;

        Ok(user)
    }

    /// Issue a fresh API key, replacing any previous one.
    pub async fn set_api_key(id: &str, db: &SurrealDbClient) -> Result<String, AppError> {
        let api_key = format!("sk_{}", Uuid::new_v4().to_string().replace('-', ""));

        let user: Option<User> = db
            .client
            .query(
                "UPDATE type::thing('user', $id)
                SET api_key = $api_key
                RETURN AFTER",
            )
            .bind(("id", id.to_owned()))
            .bind(("api_key", api_key.clone()))
            .await?
            .take(0)?;

        if user.is_some() {
            Ok(api_key)
        } else {
            Err(AppError::Auth("User not found".into()))
        }
    }

    pub async fn revoke_api_key(id: &str, db: &SurrealDbClient) -> Result<(), AppError> {
        let user: Option<User> = db
            .client
            .query(
                "UPDATE type::thing('user', $id)
                SET api_key = NONE
                RETURN AFTER",
            )
            .bind(("id", id.to_owned()))
            .await?
            .take(0)?;

        if user.is_some() {
            Ok(())
        } else {
            Err(AppError::Auth("User was not found".into()))
        }
    }
}
