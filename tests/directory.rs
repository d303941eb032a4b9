use anyhow::Result;
use entity::{employees, hrs, project_managers, users};
use products_hr::{
    ApiError, Caller, Decimal, EmployeePatch, HrPatch, Profile, ProjectManagerPatch, Role,
    Session,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use suite_tests::{Fixture, new_employee, new_hr, new_project_manager};

async fn identity(fx: &Fixture, username: &str) -> Result<users::Model> {
    users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(&fx.pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("identity {username} missing"))
}

#[tokio::test]
async fn create_links_one_identity_to_one_matching_profile() -> Result<()> {
    let fx = Fixture::new().await?;
    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "John.Doe@Example.com"))
        .await?;
    assert!(username.starts_with("john_"));

    let user = identity(&fx, &username).await?;
    assert_eq!(user.role, Role::Employee);
    assert!(user.password_hash.is_none());
    let profile = Profile::load(&fx.pool, &user).await?.expect("profile");
    profile.ensure_owned_by(&user)?;
    let Profile::Employee(employee) = &profile else {
        panic!("expected an employee profile, got {profile:?}");
    };
    assert_eq!(employee.first_name, user.first_name);
    assert_eq!(employee.last_name, user.last_name);
    assert_eq!(employee.email, "john.doe@example.com");
    assert_eq!(employee.email, user.email);

    assert_eq!(fx.count("users").await?, 2);
    assert_eq!(fx.count("employees").await?, 1);
    assert_eq!(fx.count("project_managers").await?, 0);
    Ok(())
}

#[tokio::test]
async fn hr_registration_derives_username_and_hashes_password() -> Result<()> {
    let fx = Fixture::new().await?;
    assert_eq!(fx.hr_username, "alice_hr");
    let user = identity(&fx, "alice_hr").await?;
    assert_eq!(user.role, Role::Hr);
    let hash = user.password_hash.as_deref().unwrap_or_default();
    assert!(hash.starts_with("$argon2"));
    assert_ne!(hash, suite_tests::HR_PASSWORD);

    let wing = fx
        .directory
        .register_hr(new_hr("Bob", "North Wing", "bob@example.com"))
        .await?;
    assert_eq!(wing, "bob_north_wing");
    Ok(())
}

#[tokio::test]
async fn duplicate_hr_username_conflicts_and_leaves_no_trace() -> Result<()> {
    let fx = Fixture::new().await?;
    let err = fx
        .directory
        .register_hr(new_hr("Alice", "hr", "other.alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{err:?}");
    assert_eq!(err.message(), "Username alice_hr is already taken");
    assert_eq!(fx.count("users").await?, 1);
    assert_eq!(fx.count("hrs").await?, 1);
    Ok(())
}

#[tokio::test]
async fn overlong_derived_username_is_a_validation_error() -> Result<()> {
    let fx = Fixture::new().await?;
    let first = "A".repeat(50);
    let branch = "b".repeat(100);
    let err = fx
        .directory
        .register_hr(new_hr(&first, &branch, "long@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)), "{err:?}");
    assert_eq!(err.message(), "username must be <= 150 characters");
    assert_eq!(fx.count("users").await?, 1);
    assert_eq!(fx.count("hrs").await?, 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_profile_email_conflicts() -> Result<()> {
    let fx = Fixture::new().await?;
    fx.directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    let err = fx
        .directory
        .create_employee(&fx.hr, new_employee("Jane", "Roe", "JOHN@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Email john@example.com is already in use");
    assert_eq!(fx.count("employees").await?, 1);
    assert_eq!(fx.count("users").await?, 2);
    Ok(())
}

#[tokio::test]
async fn missing_required_fields_are_validation_errors() -> Result<()> {
    let fx = Fixture::new().await?;
    let mut input = new_employee("John", "Doe", "john@example.com");
    input.department = "  ".into();
    let err = fx.directory.create_employee(&fx.hr, input).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(err.message(), "department is required");

    let mut input = new_employee("John", "Doe", "not-an-email");
    input.department = "Engineering".into();
    let err = fx.directory.create_employee(&fx.hr, input).await.unwrap_err();
    assert_eq!(err.message(), "Invalid email address");

    let mut input = new_hr("Carol", "HR", "carol@example.com");
    input.password.clear();
    let err = fx.directory.register_hr(input).await.unwrap_err();
    assert_eq!(err.message(), "password is required");
    assert_eq!(fx.count("users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn empty_patch_changes_nothing() -> Result<()> {
    let fx = Fixture::new().await?;
    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    let before_user = identity(&fx, &username).await?;
    let before = fx.directory.get_employee(&fx.hr, &username).await?;

    fx.directory
        .update_employee(&fx.hr, &username, EmployeePatch::default())
        .await?;
    fx.directory
        .update_employee(
            &fx.hr,
            &username,
            EmployeePatch {
                first_name: Some(String::new()),
                email: Some("   ".into()),
                ..EmployeePatch::default()
            },
        )
        .await?;

    assert_eq!(fx.directory.get_employee(&fx.hr, &username).await?, before);
    assert_eq!(identity(&fx, &username).await?, before_user);
    Ok(())
}

#[tokio::test]
async fn department_only_update_keeps_name_and_email() -> Result<()> {
    let fx = Fixture::new().await?;
    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    fx.directory
        .update_employee(
            &fx.hr,
            &username,
            EmployeePatch {
                department: Some("Sales".into()),
                ..EmployeePatch::default()
            },
        )
        .await?;

    let record = fx.directory.get_employee(&fx.hr, &username).await?;
    assert_eq!(record.department, "Sales");
    assert_eq!(record.first_name, "John");
    assert_eq!(record.email, "john@example.com");
    let user = identity(&fx, &username).await?;
    assert_eq!(
        (user.first_name.as_str(), user.email.as_str()),
        ("John", "john@example.com")
    );
    Ok(())
}

#[tokio::test]
async fn name_and_email_changes_reach_identity_and_profile() -> Result<()> {
    let fx = Fixture::new().await?;
    let username = fx
        .directory
        .create_project_manager(&fx.hr, new_project_manager("Pat", "pat@example.com"))
        .await?;
    fx.directory
        .update_project_manager(
            &fx.hr,
            &username,
            ProjectManagerPatch {
                last_name: Some("Morgan".into()),
                email: Some("pat.morgan@example.com".into()),
                ..ProjectManagerPatch::default()
            },
        )
        .await?;

    let user = identity(&fx, &username).await?;
    let profile = project_managers::Entity::find()
        .filter(project_managers::Column::UserId.eq(user.id))
        .one(&fx.pool)
        .await?
        .expect("profile");
    assert_eq!(user.last_name, "Morgan");
    assert_eq!(profile.last_name, "Morgan");
    assert_eq!(user.email, "pat.morgan@example.com");
    assert_eq!(profile.email, "pat.morgan@example.com");
    assert_eq!(profile.first_name, "Pat");
    assert_eq!(profile.department, "Delivery");
    Ok(())
}

#[tokio::test]
async fn own_hr_update_changes_branch_only() -> Result<()> {
    let fx = Fixture::new().await?;
    fx.directory
        .update_hr(
            &fx.hr,
            &fx.hr_username,
            HrPatch {
                branch: Some("People Ops".into()),
                ..HrPatch::default()
            },
        )
        .await?;
    let record = fx.directory.get_hr(&fx.hr, &fx.hr_username).await?;
    assert_eq!(record.branch, "People Ops");
    // The username is fixed at creation.
    assert_eq!(record.username, "alice_hr");
    assert_eq!(record.first_name, "Alice");
    Ok(())
}

#[tokio::test]
async fn update_of_unknown_or_wrong_role_username_is_not_found() -> Result<()> {
    let fx = Fixture::new().await?;
    let manager = fx
        .directory
        .create_project_manager(&fx.hr, new_project_manager("Pat", "pat@example.com"))
        .await?;
    let err = fx
        .directory
        .update_employee(&fx.hr, &manager, EmployeePatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Employee not found");
    let err = fx
        .directory
        .update_project_manager(&fx.hr, "ghost", ProjectManagerPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Project Manager not found");
    let err = fx.directory.get_hr(&fx.hr, &manager).await.unwrap_err();
    assert_eq!(err.message(), "HR not found");
    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_not_found() -> Result<()> {
    let fx = Fixture::new().await?;
    let employee = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    let manager = fx
        .directory
        .create_project_manager(&fx.hr, new_project_manager("Pat", "pat@example.com"))
        .await?;

    assert!(fx.directory.delete_employee(&fx.hr, &employee).await?);
    assert!(fx.directory.delete_project_manager(&fx.hr, &manager).await?);

    let err = fx.directory.get_employee(&fx.hr, &employee).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    let err = fx
        .directory
        .get_project_manager(&fx.hr, &manager)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    let err = fx.directory.delete_employee(&fx.hr, &employee).await.unwrap_err();
    assert_eq!(err.message(), "Employee not found");
    assert_eq!(fx.count("users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_a_manager_detaches_reports() -> Result<()> {
    let fx = Fixture::new().await?;
    let manager = fx
        .directory
        .create_project_manager(&fx.hr, new_project_manager("Pat", "pat@example.com"))
        .await?;
    let mut input = new_employee("John", "Doe", "john@example.com");
    input.reporting_manager = Some(manager.clone());
    let employee = fx.directory.create_employee(&fx.hr, input).await?;
    let record = fx.directory.get_employee(&fx.hr, &employee).await?;
    assert_eq!(record.reporting_manager.as_deref(), Some(manager.as_str()));

    fx.directory.delete_project_manager(&fx.hr, &manager).await?;

    let record = fx.directory.get_employee(&fx.hr, &employee).await?;
    assert_eq!(record.reporting_manager, None);
    let row = employees::Entity::find().one(&fx.pool).await?.expect("employee");
    assert_eq!(row.reporting_manager_id, None);
    Ok(())
}

#[tokio::test]
async fn unknown_reporting_manager_is_rejected() -> Result<()> {
    let fx = Fixture::new().await?;
    let mut input = new_employee("John", "Doe", "john@example.com");
    input.reporting_manager = Some("nobody_241130000000".into());
    let err = fx.directory.create_employee(&fx.hr, input).await.unwrap_err();
    assert_eq!(err.message(), "Project Manager not found");
    assert_eq!(fx.count("employees").await?, 0);
    assert_eq!(fx.count("users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn salary_and_designation_round_through_listing() -> Result<()> {
    let fx = Fixture::new().await?;
    let mut input = new_employee("John", "Doe", "john@example.com");
    input.designation = Some("Engineer".into());
    input.salary = Some(Decimal::from(52_000));
    let username = fx.directory.create_employee(&fx.hr, input).await?;

    fx.directory
        .update_employee(
            &fx.hr,
            &username,
            EmployeePatch {
                salary: Some("52500.5".parse::<Decimal>()?),
                ..EmployeePatch::default()
            },
        )
        .await?;

    let listing = fx.directory.list_employees(&fx.hr).await?;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].designation.as_deref(), Some("Engineer"));
    assert_eq!(listing[0].salary.as_deref(), Some("52500.50"));
    Ok(())
}

#[tokio::test]
async fn salary_with_sub_cent_precision_is_rejected() -> Result<()> {
    let fx = Fixture::new().await?;
    let mut input = new_employee("John", "Doe", "john@example.com");
    input.salary = Some("1234.567".parse::<Decimal>()?);
    let err = fx.directory.create_employee(&fx.hr, input).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)), "{err:?}");
    assert_eq!(fx.count("employees").await?, 0);

    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("Jane", "Doe", "jane@example.com"))
        .await?;
    let err = fx
        .directory
        .update_employee(
            &fx.hr,
            &username,
            EmployeePatch {
                salary: Some("100000000".parse::<Decimal>()?),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.message(), "salary must have at most 10 digits");
    Ok(())
}

#[tokio::test]
async fn listings_are_ordered_by_name() -> Result<()> {
    let fx = Fixture::new().await?;
    for (first, email) in [("Zed", "zed@example.com"), ("Amy", "amy@example.com")] {
        fx.directory
            .create_employee(&fx.hr, new_employee(first, "Doe", email))
            .await?;
    }
    fx.directory
        .register_hr(new_hr("Bob", "HR", "bob@example.com"))
        .await?;

    let names: Vec<_> = fx
        .directory
        .list_employees(&fx.hr)
        .await?
        .into_iter()
        .map(|record| record.first_name)
        .collect();
    assert_eq!(names, ["Amy", "Zed"]);
    let hrs: Vec<_> = fx
        .directory
        .list_hrs(&fx.hr)
        .await?
        .into_iter()
        .map(|record| record.username)
        .collect();
    assert_eq!(hrs, ["alice_hr", "bob_hr"]);
    Ok(())
}

#[tokio::test]
async fn non_hr_sessions_are_refused_without_effect() -> Result<()> {
    let fx = Fixture::new().await?;
    let username = fx
        .directory
        .create_employee(&fx.hr, new_employee("John", "Doe", "john@example.com"))
        .await?;
    let employee = Caller::from(Session::new(username.clone(), Role::Employee));

    let err = fx
        .directory
        .create_employee(&employee, new_employee("Eve", "Doe", "eve@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    let err = fx
        .directory
        .update_employee(
            &employee,
            &username,
            EmployeePatch {
                department: Some("Sales".into()),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    let err = fx
        .directory
        .delete_employee(&Caller::Anonymous, &username)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(fx.directory.list_hrs(&employee).await.is_err());

    let record = fx.directory.get_employee(&fx.hr, &username).await?;
    assert_eq!(record.department, "Engineering");
    assert_eq!(fx.count("employees").await?, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_an_hr_removes_identity_and_profile() -> Result<()> {
    let fx = Fixture::new().await?;
    let bob = fx
        .directory
        .register_hr(new_hr("Bob", "HR", "bob@example.com"))
        .await?;
    fx.directory.delete_hr(&fx.hr, &bob).await?;
    assert_eq!(
        hrs::Entity::find().all(&fx.pool).await?.len(),
        1,
        "only alice remains"
    );
    assert!(
        users::Entity::find()
            .filter(users::Column::Username.eq(bob.as_str()))
            .one(&fx.pool)
            .await?
            .is_none()
    );
    Ok(())
}
