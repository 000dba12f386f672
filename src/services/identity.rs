// src/services/identity.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{NewUser, RegisterRequest, Role, User, UserChanges},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::Claims,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Whether `user` may perform an operation that requires `required`.
/// Students may do what any signed-in user may; admins may do everything.
pub fn authorize(user: &User, required: Role) -> bool {
    match required {
        Role::Student => true,
        Role::Admin => user.role == Role::Admin,
    }
}

/// Registers a student. Grade and group are mandatory for students.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let password = hash_password(&req.password)?;
    let user = state
        .users
        .insert_user(NewUser {
            name: req.name,
            email: req.email,
            password,
            role: Role::Student,
            grade: Some(req.grade),
            group: Some(req.group),
        })
        .await?;

    tracing::info!("Registered student {} ({})", user.id, user.email);
    Ok(user)
}

/// Checks an email/password pair.
///
/// Unknown email and wrong password produce the same error.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User, AppError> {
    let user = state
        .users
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(password, &user.password)? {
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Resolves verified token claims to the stored user record.
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    let id = claims.user_id()?;
    state
        .users
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))
}

/// Creates the configured admin account unless that email already exists.
pub async fn seed_admin(state: &AppState) -> Result<(), AppError> {
    let config = &state.config;
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if state.users.find_user_by_email(email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    state
        .users
        .insert_user(NewUser {
            name: config.admin_name.clone().unwrap_or_else(|| "Administrator".to_string()),
            email: email.clone(),
            password: hash_password(password)?,
            role: Role::Admin,
            grade: None,
            group: None,
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}

/// Admin edit of another account. Role changes are logged.
pub async fn update_user(state: &AppState, id: Uuid, changes: UserChanges) -> Result<User, AppError> {
    changes.validate()?;
    let role_change = changes.role;
    let user = state
        .users
        .update_user(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(role) = role_change {
        tracing::warn!("User {} role set to {}", user.id, role);
    }
    Ok(user)
}

/// Removes an account. Admins cannot remove themselves; the user's attempts are kept.
pub async fn delete_user(state: &AppState, acting: &User, id: Uuid) -> Result<(), AppError> {
    if acting.id == id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }
    if !state.users.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!("Admin {} deleted user {}", acting.id, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{register_student, test_state};

    #[tokio::test]
    async fn test_authenticate_accepts_correct_password() {
        let state = test_state();
        let user = register_student(&state, "ana@example.com", "grade-1", "group-a").await;

        let found = authenticate(&state, "ana@example.com", "password123").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_authenticate_errors_have_same_shape() {
        let state = test_state();
        register_student(&state, "ana@example.com", "grade-1", "group-a").await;

        let wrong_password = authenticate(&state, "ana@example.com", "nope").await.unwrap_err();
        let unknown_email = authenticate(&state, "ghost@example.com", "nope").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let state = test_state();
        register_student(&state, "ana@example.com", "grade-1", "group-a").await;

        let err = register(
            &state,
            RegisterRequest {
                name: "Ana again".to_string(),
                email: "ana@example.com".to_string(),
                password: "password123".to_string(),
                grade: "grade-1".to_string(),
                group: "group-a".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_authorize_by_role() {
        let state = test_state();
        let student = register_student(&state, "ana@example.com", "grade-1", "group-a").await;
        let admin = crate::testing::create_admin(&state).await;

        assert!(authorize(&student, Role::Student));
        assert!(!authorize(&student, Role::Admin));
        assert!(authorize(&admin, Role::Student));
        assert!(authorize(&admin, Role::Admin));
    }

    #[tokio::test]
    async fn test_seed_admin_is_idempotent() {
        let mut state = test_state();
        state.config.admin_email = Some("root@example.com".to_string());
        state.config.admin_password = Some("rootpass".to_string());

        seed_admin(&state).await.unwrap();
        seed_admin(&state).await.unwrap();

        let users = state.users.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let state = test_state();
        let admin = crate::testing::create_admin(&state).await;

        let err = delete_user(&state, &admin, admin.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(state.users.find_user(admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_user_changes_only_given_fields() {
        let state = test_state();
        let student = register_student(&state, "ana@example.com", "grade-1", "group-a").await;

        let updated = update_user(
            &state,
            student.id,
            UserChanges {
                group: Some("group-b".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.group.as_deref(), Some("group-b"));
        assert_eq!(updated.grade.as_deref(), Some("grade-1"));
        assert_eq!(updated.name, student.name);
        assert!(matches!(
            update_user(&state, Uuid::new_v4(), UserChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
