use anyhow::Result;
use products_hr::{ApiError, NewHoliday, NewLeave};
use suite_tests::{Fixture, date, new_employee, new_project_manager};

fn leave(username: &str, days: i64, start: (i32, u32, u32), end: (i32, u32, u32)) -> NewLeave {
    NewLeave {
        employee_username: username.to_string(),
        number_of_days: days,
        start_date: Some(date(start.0, start.1, start.2)),
        end_date: Some(date(end.0, end.1, end.2)),
        approvable: false,
    }
}

async fn employee(fx: &Fixture, first: &str, email: &str) -> Result<String> {
    Ok(fx
        .directory
        .create_employee(&fx.hr, new_employee(first, "Doe", email))
        .await?)
}

#[tokio::test]
async fn leave_is_recorded_against_the_employee() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    let mut input = leave(&john, 5, (2024, 6, 3), (2024, 6, 7));
    input.approvable = true;
    let record = fx.directory.create_leave(&fx.hr, input).await?;
    assert_eq!(record.employee, john);
    assert_eq!(record.employee_name, "John Doe");
    assert_eq!(record.number_of_days, 5);
    assert!(record.approvable);

    let all = fx.directory.list_leaves(&fx.hr).await?;
    assert_eq!(all, vec![record]);
    Ok(())
}

#[tokio::test]
async fn approvable_defaults_to_false() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    let record = fx
        .directory
        .create_leave(&fx.hr, leave(&john, 1, (2024, 6, 3), (2024, 6, 3)))
        .await?;
    assert!(!record.approvable);
    Ok(())
}

#[tokio::test]
async fn end_before_start_is_rejected() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    let err = fx
        .directory
        .create_leave(&fx.hr, leave(&john, 2, (2024, 6, 7), (2024, 6, 6)))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)), "{err:?}");
    assert_eq!(fx.count("leaves").await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_employee_is_rejected() -> Result<()> {
    let fx = Fixture::new().await?;
    let err = fx
        .directory
        .create_leave(&fx.hr, leave("nonexistent_user", 2, (2024, 6, 3), (2024, 6, 4)))
        .await
        .unwrap_err();
    assert!(err.message().contains("Employee not found"));

    // Resolution is restricted to employees.
    let err = fx
        .directory
        .create_leave(&fx.hr, leave(&fx.hr_username, 2, (2024, 6, 3), (2024, 6, 4)))
        .await
        .unwrap_err();
    assert!(err.message().contains("Employee not found"));
    Ok(())
}

#[tokio::test]
async fn non_positive_or_oversized_day_counts_are_rejected() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    for days in [0, -3, i64::from(i32::MAX) + 1] {
        let err = fx
            .directory
            .create_leave(&fx.hr, leave(&john, days, (2024, 6, 3), (2024, 6, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)), "{days}: {err:?}");
    }
    let mut input = leave(&john, 1, (2024, 6, 3), (2024, 6, 4));
    input.start_date = None;
    let err = fx.directory.create_leave(&fx.hr, input).await.unwrap_err();
    assert_eq!(err.message(), "start_date is required");
    Ok(())
}

#[tokio::test]
async fn deleting_an_employee_cascades_to_leaves() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    let jane = employee(&fx, "Jane", "jane@example.com").await?;
    for (start, end) in [((2024, 6, 3), (2024, 6, 4)), ((2024, 7, 1), (2024, 7, 5))] {
        fx.directory
            .create_leave(&fx.hr, leave(&john, 2, start, end))
            .await?;
    }
    fx.directory
        .create_leave(&fx.hr, leave(&jane, 1, (2024, 8, 1), (2024, 8, 1)))
        .await?;
    assert_eq!(fx.count("leaves").await?, 3);

    fx.directory.delete_employee(&fx.hr, &john).await?;

    assert_eq!(fx.count("leaves").await?, 1);
    let remaining = fx.directory.list_leaves(&fx.hr).await?;
    assert_eq!(remaining[0].employee, jane);
    Ok(())
}

#[tokio::test]
async fn per_user_listing_resolves_any_role() -> Result<()> {
    let fx = Fixture::new().await?;
    let john = employee(&fx, "John", "john@example.com").await?;
    let pat = fx
        .directory
        .create_project_manager(&fx.hr, new_project_manager("Pat", "pat@example.com"))
        .await?;
    fx.directory
        .create_leave(&fx.hr, leave(&john, 5, (2024, 6, 3), (2024, 6, 7)))
        .await?;

    let johns = fx.directory.list_leaves_for_user(&fx.hr, &john).await?;
    assert_eq!(johns.len(), 1);
    assert_eq!(johns[0].number_of_days, 5);
    assert!(fx.directory.list_leaves_for_user(&fx.hr, &pat).await?.is_empty());
    assert!(
        fx.directory
            .list_leaves_for_user(&fx.hr, &fx.hr_username)
            .await?
            .is_empty()
    );
    let err = fx
        .directory
        .list_leaves_for_user(&fx.hr, "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn holidays_are_listed_by_date_and_deduplicated() -> Result<()> {
    let fx = Fixture::new().await?;
    for (name, when) in [("Christmas", date(2024, 12, 25)), ("New Year", date(2024, 1, 1))] {
        fx.directory
            .create_holiday(
                &fx.hr,
                NewHoliday {
                    name: name.into(),
                    date: Some(when),
                },
            )
            .await?;
    }
    fx.directory
        .ensure_holiday("New Year", date(2024, 1, 1))
        .await?;

    let names: Vec<_> = fx
        .directory
        .list_holidays(&fx.hr)
        .await?
        .into_iter()
        .map(|holiday| holiday.name)
        .collect();
    assert_eq!(names, ["New Year", "Christmas"]);

    let err = fx
        .directory
        .create_holiday(&fx.hr, NewHoliday::default())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "name is required");
    Ok(())
}
