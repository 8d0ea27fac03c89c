use rusqlite::Connection;
use secucar_core::db::open_db_in_memory;
use secucar_core::{
    Device, DeviceRepository, NewTrack, RecordKind, RepoError, Sample, SampleRepository,
    SqliteDeviceRepository, SqliteSampleRepository, SqliteTrackRepository, SqliteUserRepository,
    Track, TrackRepository, User, UserProfile, UserRepository,
};

fn profile(username: &str) -> UserProfile {
    UserProfile {
        username: username.to_string(),
        name: "Jan".to_string(),
        surname: "Kowalski".to_string(),
        email: format!("{username}@example.com"),
        telephone_number: 600_100_200,
        city: "Poznan".to_string(),
        street: "Polna".to_string(),
        home_number: 12,
        flat_number: 4,
        postal_code: "60-001".to_string(),
        password_hash: "5f4dcc3b5aa765d61d8327deb882cf99".to_string(),
    }
}

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn user_insert_assigns_identity_and_select_roundtrips() {
    let conn = setup();
    let repo = SqliteUserRepository::new(&conn);

    let user = User::new(profile("jkowalski"));
    let id = repo.insert(&user).unwrap();
    assert!(id > 0);

    let loaded = repo.select_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, User::with_id(id, profile("jkowalski")));

    let by_name = repo.select_by_username("jkowalski").unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, id);
    assert!(repo.select_by_username("nobody").unwrap().is_empty());
}

#[test]
fn duplicate_username_is_a_conflict() {
    let conn = setup();
    let repo = SqliteUserRepository::new(&conn);

    repo.insert(&User::new(profile("taken"))).unwrap();
    let err = repo.insert(&User::new(profile("taken"))).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn update_and_delete_missing_rows_report_not_found() {
    let conn = setup();
    let repo = SqliteDeviceRepository::new(&conn);

    let mut ghost = Device::new(1, 10, "here", "ghost", 1);
    ghost.id = 404;
    let update_err = repo.update(&ghost).unwrap_err();
    assert!(matches!(
        update_err,
        RepoError::NotFound {
            kind: RecordKind::Device,
            id: 404
        }
    ));

    let delete_err = repo.delete(404).unwrap_err();
    assert!(matches!(delete_err, RepoError::NotFound { id: 404, .. }));
}

#[test]
fn devices_are_selected_by_owner_in_identity_order() {
    let conn = setup();
    let repo = SqliteDeviceRepository::new(&conn);

    let first = repo.insert(&Device::new(1, 100, "a", "first", 1)).unwrap();
    repo.insert(&Device::new(2, 200, "b", "other owner", 1))
        .unwrap();
    let second = repo.insert(&Device::new(1, 300, "c", "second", 2)).unwrap();

    let owned = repo.select_by_user(1).unwrap();
    let ids: Vec<i64> = owned.iter().map(|device| device.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(repo.select_by_user(3).unwrap().is_empty());
}

#[test]
fn track_update_is_full_row_overwrite() {
    let conn = setup();
    let repo = SqliteTrackRepository::new(&conn);

    let id = repo
        .insert(&Track::new(NewTrack::open(5, 1_000, "depot")))
        .unwrap();
    let mut track = repo.select_by_id(id).unwrap().unwrap();
    assert!(track.is_open());

    track.start_location = "moved depot".to_string();
    track.end_timestamp = Some(2_000);
    track.end_location = Some("home".to_string());
    track.distance = Some(42);
    track.maneuver_assessment = Some(7);
    repo.update(&track).unwrap();

    let loaded = repo.select_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, track);
    assert!(loaded.is_closed());
    assert_eq!(repo.select_by_device(5).unwrap(), vec![loaded]);
}

#[test]
fn samples_are_ordered_by_timestamp_with_ties_by_identity() {
    let conn = setup();
    let repo = SqliteSampleRepository::new(&conn);

    let late = repo.insert(&Sample::new(1, 30, "c", 50, 1, 90)).unwrap();
    let early = repo.insert(&Sample::new(1, 10, "a", 40, 0, 90)).unwrap();
    let tie = repo.insert(&Sample::new(1, 30, "d", 55, 2, 95)).unwrap();
    repo.insert(&Sample::new(2, 20, "other track", 0, 0, 0))
        .unwrap();

    let ids: Vec<i64> = repo
        .select_by_track(1)
        .unwrap()
        .iter()
        .map(|sample| sample.id)
        .collect();
    assert_eq!(ids, vec![early, late, tie]);
}

#[test]
fn deleting_parents_never_cascades() {
    let conn = setup();
    let devices = SqliteDeviceRepository::new(&conn);
    let tracks = SqliteTrackRepository::new(&conn);
    let samples = SqliteSampleRepository::new(&conn);

    let device_id = devices
        .insert(&Device::new(1, 100, "a", "tracker", 1))
        .unwrap();
    let track_id = tracks
        .insert(&Track::new(NewTrack::open(device_id, 1, "start")))
        .unwrap();
    samples
        .insert(&Sample::new(track_id, 2, "52.4,16.9", 30, 1, 180))
        .unwrap();

    devices.delete(device_id).unwrap();
    assert_eq!(tracks.select_by_device(device_id).unwrap().len(), 1);

    tracks.delete(track_id).unwrap();
    assert!(tracks.select_by_id(track_id).unwrap().is_none());
    assert_eq!(samples.select_by_track(track_id).unwrap().len(), 1);
}

#[test]
fn malformed_row_is_treated_as_absent() {
    let conn = setup();
    conn.execute(
        "INSERT INTO devices (user_id, serial_number, current_location, device_name, firmware_version)
         VALUES (1, 'not-a-number', 'here', 'broken', 1);",
        [],
    )
    .unwrap();
    let broken_id = conn.last_insert_rowid();

    let repo = SqliteDeviceRepository::new(&conn);
    let healthy_id = repo.insert(&Device::new(1, 7, "there", "fine", 1)).unwrap();

    assert!(repo.select_by_id(broken_id).unwrap().is_none());
    let owned = repo.select_by_user(1).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, healthy_id);
}
