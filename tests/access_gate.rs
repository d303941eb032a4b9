use anyhow::Result;
use chrono::Duration;
use entity::{hrs, sessions, users};
use products_hr::{AccessGate, ApiError, Caller, Role};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use suite_tests::{Fixture, HR_PASSWORD, new_employee};

#[tokio::test]
async fn hr_login_establishes_a_resolvable_session() -> Result<()> {
    let fx = Fixture::new().await?;
    let gate = AccessGate::new(fx.pool.clone());
    let outcome = gate
        .login(&fx.hr_username, HR_PASSWORD, Some("tests".into()))
        .await?;
    assert_eq!(outcome.welcome(), "Welcome Alice!");
    assert_eq!(outcome.session.role, Role::Hr);

    let caller = gate.resolve(outcome.session_id).await?;
    assert_eq!(caller, Caller::from(outcome.session.clone()));

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(fx.hr_username.as_str()))
        .one(&fx.pool)
        .await?
        .expect("identity");
    assert!(user.last_login.is_some());
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_invalid_credentials() -> Result<()> {
    let fx = Fixture::new().await?;
    let gate = AccessGate::new(fx.pool.clone());
    let err = gate.login(&fx.hr_username, "nope", None).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    let err = gate.login("ghost_hr", HR_PASSWORD, None).await.unwrap_err();
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(fx.count("sessions").await?, 0);
    Ok(())
}

#[tokio::test]
async fn non_hr_principals_cannot_log_in() -> Result<()> {
    let fx = Fixture::new().await?;
    let gate = AccessGate::new(fx.pool.clone());
    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    let err = gate.login(&username, "", None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotHr));
    assert_eq!(err.message(), "User is not an HR");
    Ok(())
}

#[tokio::test]
async fn inactive_identities_cannot_log_in() -> Result<()> {
    let fx = Fixture::new().await?;
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(fx.hr_username.as_str()))
        .one(&fx.pool)
        .await?
        .expect("identity");
    let mut active: users::ActiveModel = user.into();
    active.is_active = Set(false);
    active.update(&fx.pool).await?;

    let gate = AccessGate::new(fx.pool.clone());
    let err = gate
        .login(&fx.hr_username, HR_PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn hr_identity_without_its_profile_cannot_log_in() -> Result<()> {
    let fx = Fixture::new().await?;
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(fx.hr_username.as_str()))
        .one(&fx.pool)
        .await?
        .expect("identity");
    hrs::Entity::delete_many()
        .filter(hrs::Column::UserId.eq(user.id))
        .exec(&fx.pool)
        .await?;

    let gate = AccessGate::new(fx.pool.clone());
    let err = gate
        .login(&fx.hr_username, HR_PASSWORD, None)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "HR profile not found");
    assert_eq!(fx.count("sessions").await?, 0);
    Ok(())
}

#[tokio::test]
async fn logout_returns_the_username_and_ends_the_session() -> Result<()> {
    let fx = Fixture::new().await?;
    let gate = AccessGate::new(fx.pool.clone());
    let outcome = gate.login(&fx.hr_username, HR_PASSWORD, None).await?;
    let caller = gate.resolve(outcome.session_id).await?;

    let username = gate.logout(&caller, Some(outcome.session_id)).await?;
    assert_eq!(username, "alice_hr");
    assert_eq!(gate.resolve(outcome.session_id).await?, Caller::Anonymous);

    let err = gate.logout(&Caller::Anonymous, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn expired_sessions_resolve_anonymous_and_are_removed() -> Result<()> {
    let fx = Fixture::new().await?;
    let gate = AccessGate::new(fx.pool.clone()).with_ttl(Duration::seconds(-1));
    let outcome = gate.login(&fx.hr_username, HR_PASSWORD, None).await?;
    assert_eq!(fx.count("sessions").await?, 1);

    assert_eq!(gate.resolve(outcome.session_id).await?, Caller::Anonymous);
    assert!(
        sessions::Entity::find_by_id(outcome.session_id)
            .one(&fx.pool)
            .await?
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn purge_drops_only_expired_sessions() -> Result<()> {
    let fx = Fixture::new().await?;
    let stale = AccessGate::new(fx.pool.clone()).with_ttl(Duration::seconds(-60));
    stale.login(&fx.hr_username, HR_PASSWORD, None).await?;
    let fresh = AccessGate::new(fx.pool.clone());
    let kept = fresh.login(&fx.hr_username, HR_PASSWORD, None).await?;

    assert_eq!(fresh.purge_expired().await?, 1);
    assert_eq!(fx.count("sessions").await?, 1);
    assert!(matches!(
        fresh.resolve(kept.session_id).await?,
        Caller::Authenticated(_)
    ));
    Ok(())
}

#[tokio::test]
async fn deleting_an_identity_invalidates_its_sessions() -> Result<()> {
    let fx = Fixture::new().await?;
    let bob = fx
        .directory
        .register_hr(suite_tests::new_hr("Bob", "HR", "bob@example.com"))
        .await?;
    let gate = AccessGate::new(fx.pool.clone());
    let outcome = gate.login(&bob, HR_PASSWORD, None).await?;

    fx.directory.delete_hr(&fx.hr, &bob).await?;

    assert_eq!(gate.resolve(outcome.session_id).await?, Caller::Anonymous);
    Ok(())
}
