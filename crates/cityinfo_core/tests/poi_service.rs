use cityinfo_core::{
    CityRepository, FieldPath, InMemoryCityRepository, NotFoundTarget, PatchDocument,
    PatchError, PatchOperation, PointOfInterestDraft, PointOfInterestService, RecordingNotifier,
    ServiceError, SqliteCityRepository,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

type Service<R> = PointOfInterestService<R, RecordingNotifier>;

fn memory_service() -> Service<InMemoryCityRepository> {
    PointOfInterestService::new(InMemoryCityRepository::seeded(), RecordingNotifier::new())
}

fn sqlite_service() -> Service<SqliteCityRepository> {
    PointOfInterestService::new(
        SqliteCityRepository::open_in_memory().unwrap(),
        RecordingNotifier::new(),
    )
}

fn draft(name: &str, description: Option<&str>) -> PointOfInterestDraft {
    PointOfInterestDraft::new(name, description)
}

macro_rules! for_each_backend {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() {
                    super::$name(&super::memory_service());
                }
            )*
        }

        mod sqlite {
            $(
                #[test]
                fn $name() {
                    super::$name(&super::sqlite_service());
                }
            )*
        }
    };
}

for_each_backend!(
    create_then_get_round_trip,
    ids_are_global_and_strictly_increasing,
    create_rejects_name_equal_to_description,
    update_rejects_name_equal_to_description,
    validation_runs_before_city_lookup,
    create_in_unknown_city_is_not_found,
    failing_patch_leaves_stored_child_untouched,
    patch_preserves_untouched_fields,
    patch_result_is_revalidated,
    patch_with_wrong_value_type_is_patch_error,
    delete_of_absent_child_is_not_found_every_time,
    delete_removes_child_and_notifies,
    full_update_clears_description_but_patch_keeps_it,
    get_child_through_wrong_city_is_not_found,
    city_reads_follow_include_flag,
    names_with_control_characters_are_stored_by_every_backend,
    deleting_highest_child_frees_its_id_but_not_lower_holes,
);

fn create_then_get_round_trip<R: CityRepository>(service: &Service<R>) {
    let created = service
        .create_point_of_interest(2, draft("Pier", Some("Old harbour pier")))
        .unwrap();

    let loaded = service.get_point_of_interest(2, created.id).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.name, "Pier");
    assert_eq!(loaded.description.as_deref(), Some("Old harbour pier"));
}

fn ids_are_global_and_strictly_increasing<R: CityRepository>(service: &Service<R>) {
    let mut ids = Vec::new();
    for (index, city_id) in [3, 1, 2, 3, 1].into_iter().enumerate() {
        let created = service
            .create_point_of_interest(city_id, draft(&format!("Spot {index}"), None))
            .unwrap();
        ids.push(created.id);
    }

    // Seed data ends at id 6, spread over every city.
    assert_eq!(ids, [7, 8, 9, 10, 11]);
}

fn names_with_control_characters_are_stored_by_every_backend<R: CityRepository>(
    service: &Service<R>,
) {
    let padded = format!("\0{}", "p".repeat(49));
    for name in ["\0Pier", padded.as_str()] {
        let created = service
            .create_point_of_interest(1, draft(name, Some("tab\there")))
            .unwrap();
        let loaded = service.get_point_of_interest(1, created.id).unwrap();
        assert_eq!(loaded.name, name);
        assert_eq!(loaded.description.as_deref(), Some("tab\there"));
    }
}

fn deleting_highest_child_frees_its_id_but_not_lower_holes<R: CityRepository>(
    service: &Service<R>,
) {
    service.delete_point_of_interest(3, 6).unwrap();
    let reissued = service
        .create_point_of_interest(2, draft("Rubens House", None))
        .unwrap();
    assert_eq!(reissued.id, 6);

    service.delete_point_of_interest(1, 1).unwrap();
    let next = service
        .create_point_of_interest(1, draft("Bryant Park", None))
        .unwrap();
    assert_eq!(next.id, 7);
    assert!(service.get_point_of_interest(1, 1).is_err());
}

fn create_rejects_name_equal_to_description<R: CityRepository>(service: &Service<R>) {
    let before = service.list_points_of_interest(1).unwrap();

    let err = service
        .create_point_of_interest(1, draft("X", Some("X")))
        .unwrap_err();
    let ServiceError::ValidationFailed(errors) = err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert!(errors.contains("description"));
    assert_eq!(service.list_points_of_interest(1).unwrap(), before);
}

fn update_rejects_name_equal_to_description<R: CityRepository>(service: &Service<R>) {
    let before = service.get_point_of_interest(1, 1).unwrap();

    let err = service
        .update_point_of_interest(1, 1, draft("X", Some("X")))
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(ref errors) if errors.contains("description")));
    assert_eq!(service.get_point_of_interest(1, 1).unwrap(), before);
}

fn validation_runs_before_city_lookup<R: CityRepository>(service: &Service<R>) {
    let err = service
        .create_point_of_interest(99, draft("", None))
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(_)));
}

fn create_in_unknown_city_is_not_found<R: CityRepository>(service: &Service<R>) {
    let err = service
        .create_point_of_interest(99, draft("Pier", None))
        .unwrap_err();
    assert_eq!(err, ServiceError::NotFound(NotFoundTarget::City(99)));
}

fn failing_patch_leaves_stored_child_untouched<R: CityRepository>(service: &Service<R>) {
    let before = service.get_point_of_interest(3, 5).unwrap();
    let ops = [
        PatchOperation::replace(FieldPath::Name, "Tour Eiffel"),
        PatchOperation::test(FieldPath::Description, "not the current description"),
    ];

    let err = service.patch_point_of_interest(3, 5, &ops).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Patch(PatchError::TestFailed { index: 1, .. })
    ));
    assert_eq!(service.get_point_of_interest(3, 5).unwrap(), before);
}

fn patch_preserves_untouched_fields<R: CityRepository>(service: &Service<R>) {
    let created = service
        .create_point_of_interest(1, draft("Pier", Some("Old harbour pier")))
        .unwrap();
    let document = PatchDocument::from_json(
        r#"[{ "op": "replace", "path": "/description", "value": "Rebuilt in 2019" }]"#,
    )
    .unwrap();

    service
        .patch_point_of_interest(1, created.id, document.operations())
        .unwrap();

    let patched = service.get_point_of_interest(1, created.id).unwrap();
    assert_eq!(patched.name, "Pier");
    assert_eq!(patched.description.as_deref(), Some("Rebuilt in 2019"));
}

fn patch_result_is_revalidated<R: CityRepository>(service: &Service<R>) {
    let before = service.get_point_of_interest(1, 2).unwrap();
    let ops = [PatchOperation::replace(
        FieldPath::Description,
        before.name.as_str(),
    )];

    let err = service.patch_point_of_interest(1, 2, &ops).unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(ref errors) if errors.contains("description")));
    assert_eq!(service.get_point_of_interest(1, 2).unwrap(), before);
}

fn patch_with_wrong_value_type_is_patch_error<R: CityRepository>(service: &Service<R>) {
    let ops = [PatchOperation::replace(FieldPath::Name, 12)];
    let err = service.patch_point_of_interest(1, 1, &ops).unwrap_err();
    assert!(matches!(err, ServiceError::Patch(PatchError::InvalidValue { .. })));
}

fn delete_of_absent_child_is_not_found_every_time<R: CityRepository>(service: &Service<R>) {
    let expected = ServiceError::NotFound(NotFoundTarget::PointOfInterest {
        city_id: 1,
        poi_id: 404,
    });
    assert_eq!(service.delete_point_of_interest(1, 404).unwrap_err(), expected);
    assert_eq!(service.delete_point_of_interest(1, 404).unwrap_err(), expected);
    assert!(service.notifier().sent().is_empty());
}

fn delete_removes_child_and_notifies<R: CityRepository>(service: &Service<R>) {
    service.delete_point_of_interest(2, 3).unwrap();

    assert!(matches!(
        service.get_point_of_interest(2, 3),
        Err(ServiceError::NotFound(NotFoundTarget::PointOfInterest { .. }))
    ));
    let remaining: Vec<i64> = service
        .list_points_of_interest(2)
        .unwrap()
        .iter()
        .map(|poi| poi.id)
        .collect();
    assert_eq!(remaining, [4]);

    assert_eq!(
        service.notifier().sent(),
        [(
            "Point of interest deleted.".to_string(),
            "Point of interest Cathedral of Our Lady with id 3 was deleted.".to_string()
        )]
    );
    assert!(matches!(
        service.delete_point_of_interest(2, 3),
        Err(ServiceError::NotFound(_))
    ));
}

fn full_update_clears_description_but_patch_keeps_it<R: CityRepository>(service: &Service<R>) {
    service
        .patch_point_of_interest(3, 6, &[PatchOperation::replace(FieldPath::Name, "Louvre")])
        .unwrap();
    let patched = service.get_point_of_interest(3, 6).unwrap();
    assert_eq!(patched.name, "Louvre");
    assert_eq!(
        patched.description.as_deref(),
        Some("The world's largest museum.")
    );

    service
        .update_point_of_interest(3, 6, draft("Musée du Louvre", None))
        .unwrap();
    let replaced = service.get_point_of_interest(3, 6).unwrap();
    assert_eq!(replaced.name, "Musée du Louvre");
    assert_eq!(replaced.description, None);
}

fn get_child_through_wrong_city_is_not_found<R: CityRepository>(service: &Service<R>) {
    assert_eq!(
        service.get_point_of_interest(1, 5).unwrap_err(),
        ServiceError::NotFound(NotFoundTarget::PointOfInterest {
            city_id: 1,
            poi_id: 5
        })
    );
    assert_eq!(
        service.get_point_of_interest(42, 5).unwrap_err(),
        ServiceError::NotFound(NotFoundTarget::City(42))
    );
    assert_eq!(
        service.list_points_of_interest(42).unwrap_err(),
        ServiceError::NotFound(NotFoundTarget::City(42))
    );
}

fn city_reads_follow_include_flag<R: CityRepository>(service: &Service<R>) {
    let names: Vec<String> = service
        .list_cities()
        .unwrap()
        .into_iter()
        .map(|city| city.name)
        .collect();
    assert_eq!(names, ["Antwerp", "New York City", "Paris"]);

    let bare = service.get_city(1, false).unwrap();
    assert!(bare.points_of_interest.is_empty());
    let full = service.get_city(1, true).unwrap();
    assert_eq!(full.points_of_interest.len(), 2);
    assert_eq!(
        service.get_city(7, true).unwrap_err(),
        ServiceError::NotFound(NotFoundTarget::City(7))
    );
}

#[test]
fn concurrent_creates_assign_distinct_ids() {
    let service = Arc::new(memory_service());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                (0..5)
                    .map(|round| {
                        let city_id = 1 + (worker + round) % 3;
                        service
                            .create_point_of_interest(
                                city_id,
                                draft(&format!("Spot {worker}-{round}"), None),
                            )
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let worker_ids = handle.join().unwrap();
        assert!(worker_ids.windows(2).all(|pair| pair[0] < pair[1]));
        ids.extend(worker_ids);
    }
    assert_eq!(ids.len(), 40);
    assert_eq!(ids.iter().min(), Some(&7));
    assert_eq!(ids.iter().max(), Some(&46));
}

#[test]
fn sqlite_service_is_shareable_across_threads() {
    let service = Arc::new(sqlite_service());
    let reader = {
        let service = Arc::clone(&service);
        thread::spawn(move || service.list_points_of_interest(3).unwrap().len())
    };
    service
        .create_point_of_interest(3, draft("Sacré-Cœur", None))
        .unwrap();
    let seen = reader.join().unwrap();
    assert!(seen == 2 || seen == 3);
    assert_eq!(service.list_points_of_interest(3).unwrap().len(), 3);
}

#[test]
fn sqlite_changes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cityinfo.sqlite3");

    let created = {
        let service = PointOfInterestService::new(
            SqliteCityRepository::open(&path).unwrap(),
            RecordingNotifier::new(),
        );
        let created = service
            .create_point_of_interest(2, draft("Grote Markt", Some("Central square")))
            .unwrap();
        service.delete_point_of_interest(2, 4).unwrap();
        service
            .with_repository(|repo| assert_eq!(repo.pending_changes(), 0))
            .unwrap();
        created
    };

    let reopened = PointOfInterestService::new(
        SqliteCityRepository::open(&path).unwrap(),
        RecordingNotifier::new(),
    );
    assert_eq!(reopened.get_point_of_interest(2, created.id).unwrap(), created);
    assert!(matches!(
        reopened.get_point_of_interest(2, 4),
        Err(ServiceError::NotFound(_))
    ));
}
