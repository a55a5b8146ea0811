use chrono::{Duration, Utc};
use db::models::attendance_session_status::StudentStatus;
use db::models::izin_approval::Decision;
use db::models::izin_sakit_pulang::{IzinStatus, IzinType};
use db::models::santri::StatusKehadiran;
use db::test_utils::setup_test_db;
use services::attendance_session::AttendanceSessionService;
use services::attendance_type::{AttendanceTypeService, CreateAttendanceType};
use services::izin::{CreateIzin, IzinService};
use services::report::{ReportScope, ReportService};
use services::santri::{CreateSantri, SantriService};
use services::{Actor, AppError};
use util::feed::FeedManager;
use util::state::AppState;

#[tokio::test]
async fn week_of_roll_calls_with_a_leave_in_between() {
    let state = AppState::new(setup_test_db().await, FeedManager::default());
    let santri_svc = SantriService::new(state.clone());
    let types = AttendanceTypeService::new(state.clone());
    let sessions = AttendanceSessionService::new(state.clone());
    let izin = IzinService::new(state.clone());
    let reports = ReportService::new(state.clone());

    let mut ids = Vec::new();
    for nama in ["Aisyah", "Fatimah", "Khadijah"] {
        let santri = santri_svc
            .create_santri(CreateSantri {
                nama: nama.into(),
                kode_asrama: "A1".into(),
            })
            .await
            .unwrap();
        ids.push(santri.id);
    }
    let (aisyah, fatimah, khadijah) = (ids[0], ids[1], ids[2]);

    let subuh = types
        .create_type(CreateAttendanceType {
            is_frequent: true,
            ..CreateAttendanceType::new("Subuh")
        })
        .await
        .unwrap();

    // Fatimah goes home before the second roll call.
    let now = Utc::now();
    let application = izin
        .create_izin(
            Actor::wali(900),
            CreateIzin {
                santri_id: fatimah,
                reason: "Walimah kakak".into(),
                izin_type: IzinType::Pulang,
                leave_date: now - Duration::days(5),
                requested_return_date: now - Duration::days(2),
            },
        )
        .await
        .unwrap();

    let pengurus = Actor::pengurus(10);
    let ustadzah = Actor::ustadzah(20);

    let first = sessions
        .open_session_for_asrama(subuh.id, pengurus.id, "A1")
        .await
        .unwrap();
    for id in [aisyah, fatimah, khadijah] {
        sessions
            .set_status(first.id, id, StudentStatus::Present, pengurus.id)
            .await
            .unwrap();
    }
    sessions.close_session(first.id, pengurus.id).await.unwrap();

    izin.review(application.id(), pengurus, Decision::Approved)
        .await
        .unwrap();
    izin.approve(application.id(), ustadzah, Decision::Approved)
        .await
        .unwrap();

    let pulang = santri_svc
        .list_by_asrama("A1", Some(StatusKehadiran::Pulang))
        .await
        .unwrap();
    assert_eq!(pulang.iter().map(|s| s.id).collect::<Vec<_>>(), vec![fatimah]);

    let overdue = santri_svc.list_overdue("A1", Utc::now()).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].days_late, 2);

    let second = sessions
        .open_session_for_asrama(subuh.id, pengurus.id, "A1")
        .await
        .unwrap();
    sessions
        .set_status(second.id, aisyah, StudentStatus::Present, pengurus.id)
        .await
        .unwrap();
    sessions
        .set_status(second.id, fatimah, StudentStatus::ExcusedPulang, pengurus.id)
        .await
        .unwrap();
    let closed = sessions.close_session(second.id, pengurus.id).await.unwrap();

    let late_write = sessions
        .set_status(second.id, khadijah, StudentStatus::Present, pengurus.id)
        .await
        .unwrap_err();
    assert!(matches!(late_write, AppError::InvalidState(_)));
    assert_eq!(
        sessions.get_session(second.id).await.unwrap().student_statuses,
        closed.student_statuses
    );

    // A session still open is not part of any report.
    sessions
        .open_session_for_asrama(subuh.id, pengurus.id, "A1")
        .await
        .unwrap();

    let returned = izin.mark_returned(application.id(), Utc::now()).await.unwrap();
    assert_eq!(returned.status(), IzinStatus::Returned);
    assert!(santri_svc.list_overdue("A1", Utc::now()).await.unwrap().is_empty());

    let report = reports
        .build_report(
            now - Duration::days(1),
            Utc::now() + Duration::days(1),
            ReportScope {
                attendance_type_id: Some(subuh.id),
                santri_ids: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(report.session_count, 2);
    let rates: Vec<(&str, &str)> = report
        .students
        .iter()
        .map(|s| (s.nama.as_deref().unwrap_or(""), s.attendance_rate.as_str()))
        .collect();
    assert_eq!(
        rates,
        vec![
            ("Aisyah", "100.00%"),
            ("Fatimah", "50.00%"),
            ("Khadijah", "50.00%"),
        ]
    );
    assert_eq!(report.students[1].counts.excused_pulang_count, 1);
    assert_eq!(report.students[2].counts.absent_count, 1);

    let err = types.delete_type(subuh.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}
