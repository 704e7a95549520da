use campus_forecast::calendar::FixedCalendar;
use campus_forecast::model::{
    College, CreatePrediction, Granularity, InputPoint, Metric, MonthExpense, OwnerId,
    PredictionId, PredictionInput, PredictionRecord, PredictionSource, Scope, UpdatePrediction,
    YearStat,
};
use campus_forecast::rules::{RuleViolation, SeriesType};
use campus_forecast::store::{
    InMemoryPredictionStore, InMemoryStats, PredictionStore, StatsSource, StoreError, StoreResult,
};
use campus_forecast::{EngineConfig, ForecastError, PredictionService};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::atomic::{AtomicBool, Ordering};

const OWNER: OwnerId = 7;
const STRANGER: OwnerId = 99;

type Service = PredictionService<InMemoryPredictionStore, InMemoryStats, FixedCalendar>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn calendar() -> FixedCalendar {
    FixedCalendar::at_date(date(2026, 10, 14))
}

/// Two colleges plus a third whose profit falls below zero
fn stats() -> InMemoryStats {
    let stats = InMemoryStats::new();
    stats
        .add_college(
            College::new(1, "Engineering")
                .with_capacity(50)
                .with_max_revenue(12_000.0),
        )
        .unwrap();
    stats.add_college(College::new(2, "Medicine")).unwrap();
    stats.add_college(College::new(3, "Fine Arts")).unwrap();

    for (college_id, year, revenue, students) in [
        (1, 2021, 6_000.0, 30),
        (1, 2022, 8_000.0, 38),
        (1, 2023, 10_000.0, 46),
        (2, 2021, 1_000.0, 20),
        (2, 2022, 1_500.0, 20),
        (2, 2023, 1_200.0, 25),
        (3, 2021, 1_000.0, 10),
        (3, 2022, 1_000.0, 10),
        (3, 2023, 1_000.0, 10),
    ] {
        stats
            .upsert_year_stat(YearStat {
                college_id,
                year,
                annual_revenue: Some(revenue),
                annual_students: Some(students),
            })
            .unwrap();
    }

    for (year, spent) in [(2021, 900.0), (2022, 1_000.0), (2023, 1_100.0)] {
        stats
            .add_month_expense(MonthExpense {
                college_id: 3,
                year,
                month: 1,
                expenses: spent,
                description: Some("salaries".to_string()),
            })
            .unwrap();
    }

    stats
}

fn service() -> Service {
    service_with(EngineConfig::default())
}

fn service_with(config: EngineConfig) -> Service {
    init_logging();
    PredictionService::new(InMemoryPredictionStore::new(), stats(), calendar(), config).unwrap()
}

fn stored_request(scope: Scope, metric: Metric, granularity: Granularity, steps: usize) -> CreatePrediction {
    CreatePrediction {
        title: "Outlook".to_string(),
        description: Some("from stored data".to_string()),
        granularity,
        future_steps: Some(steps),
        input: PredictionInput::Stored { scope, metric },
    }
}

fn manual_request(series_type: SeriesType, points: Vec<InputPoint>, granularity: Granularity) -> CreatePrediction {
    CreatePrediction {
        title: "Manual series".to_string(),
        description: None,
        granularity,
        future_steps: Some(2),
        input: PredictionInput::Points {
            series_type,
            points,
        },
    }
}

fn yearly_points(values: &[f64]) -> Vec<InputPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| InputPoint::new(*value, date(2020 + i as i32, 1, 1)))
        .collect()
}

fn predicted(report: &campus_forecast::model::PredictionReport) -> Vec<f64> {
    report.forecasts.iter().map(|p| p.predicted_value).collect()
}

#[test]
fn test_students_are_capped_at_college_capacity() {
    let service = service();
    let report = service
        .create(
            OWNER,
            stored_request(Scope::College(1), Metric::Students, Granularity::Yearly, 3),
        )
        .unwrap();

    // 30, 38, 46 continues at +8 → 54, 62, 70, each capped at 50
    assert_eq!(predicted(&report), vec![50.0, 50.0, 50.0]);
    assert_eq!(report.observations.len(), 3);
    assert_eq!(report.prediction.start_date, Some(date(2021, 1, 1)));
    assert_eq!(report.forecasts[0].index, 4);
    assert_eq!(report.forecasts[0].period, date(2024, 1, 1));
    assert_eq!(report.labeled[2].label, "2026");
}

#[test]
fn test_university_scope_has_no_ceiling() {
    let service = service();
    let report = service
        .create(
            OWNER,
            stored_request(Scope::University, Metric::Students, Granularity::Yearly, 2),
        )
        .unwrap();

    // 60, 68, 81 rises every year: slope (81 - 60) / 2 = 10.5, then [68, 81, 91.5]
    let values: Vec<f64> = report.observations.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![60.0, 68.0, 81.0]);
    assert_eq!(predicted(&report), vec![91.5, 103.25]);
}

#[test]
fn test_profit_may_go_negative() {
    let service = service();
    let report = service
        .create(
            OWNER,
            stored_request(Scope::College(3), Metric::Profit, Granularity::Yearly, 2),
        )
        .unwrap();

    assert_eq!(predicted(&report), vec![-200.0, -300.0]);
}

#[test]
fn test_monthly_revenue_is_capped_per_month() {
    let service = service();
    let report = service
        .create(
            OWNER,
            stored_request(Scope::College(1), Metric::Revenue, Granularity::Monthly, 2),
        )
        .unwrap();

    assert_eq!(report.observations.len(), 36);
    // the 36-month window keeps rising but stays under 12000 / 12
    for point in &report.forecasts {
        assert!(point.predicted_value <= 1_000.0);
    }
    assert_eq!(report.forecasts[0].period, date(2024, 1, 1));
    assert_eq!(report.labeled[1].label, "2024-02");
}

#[rstest]
#[case(Metric::Students, Granularity::Monthly)]
#[case(Metric::Expenses, Granularity::Yearly)]
#[case(Metric::Revenue, Granularity::Weekly)]
fn test_invalid_combination_writes_nothing(#[case] metric: Metric, #[case] granularity: Granularity) {
    let service = service();
    let result = service.create(OWNER, stored_request(Scope::University, metric, granularity, 3));

    match result {
        Err(ForecastError::InvalidCombination {
            metric: m,
            granularity: g,
        }) => {
            assert_eq!(m, metric);
            assert_eq!(g, granularity);
        }
        other => panic!("expected InvalidCombination, got {:?}", other),
    }
    assert!(service.predictions().is_empty().unwrap());
}

#[test]
fn test_minimum_length_boundary() {
    let config = EngineConfig {
        min_points: 3,
        ..EngineConfig::default()
    };
    let service = service_with(config);

    let ok = service.create(
        OWNER,
        manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0, 3.0]), Granularity::Yearly),
    );
    assert!(ok.is_ok());

    let short = service.create(
        OWNER,
        manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
    );
    assert!(matches!(
        short,
        Err(ForecastError::InsufficientData {
            required: 3,
            actual: 2
        })
    ));
    assert_eq!(service.predictions().len().unwrap(), 1);
}

#[test]
fn test_stored_series_too_short() {
    let service = service();
    // Medicine has no expense rows
    let result = service.create(
        OWNER,
        stored_request(Scope::College(2), Metric::Expenses, Granularity::Monthly, 3),
    );
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientData { actual: 0, .. })
    ));
    assert!(service.predictions().is_empty().unwrap());
}

#[test]
fn test_manual_points_are_sorted_and_round_trip() {
    let service = service();
    let points = vec![
        InputPoint::new(30.0, date(2022, 1, 1)),
        InputPoint::new(10.0, date(2020, 1, 1)),
        InputPoint::new(20.0, date(2021, 1, 1)),
    ];
    let report = service
        .create(OWNER, manual_request(SeriesType::Generic, points, Granularity::Yearly))
        .unwrap();

    let stored = service.show(OWNER, report.prediction.id).unwrap();
    let observed: Vec<(usize, f64, NaiveDate)> = stored
        .observations
        .iter()
        .map(|o| (o.index, o.value, o.period))
        .collect();
    assert_eq!(
        observed,
        vec![
            (1, 10.0, date(2020, 1, 1)),
            (2, 20.0, date(2021, 1, 1)),
            (3, 30.0, date(2022, 1, 1)),
        ]
    );
    assert_eq!(predicted(&stored), vec![40.0, 50.0]);
    assert_eq!(stored, report);
}

#[test]
fn test_manual_series_is_never_clamped() {
    let service = service();
    let report = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[5.0, 3.0, 1.0]), Granularity::Yearly),
        )
        .unwrap();
    assert_eq!(predicted(&report), vec![-1.0, -3.0]);
}

#[test]
fn test_value_rule_violations_are_reported_per_point() {
    let service = service();
    let points = vec![
        InputPoint::new(12.5, date(2022, 1, 1)),
        InputPoint::new(10.0, date(2020, 1, 1)),
        InputPoint::new(-4.0, date(2021, 1, 1)),
    ];
    let result = service.create(OWNER, manual_request(SeriesType::Headcount, points, Granularity::Yearly));

    match result {
        Err(ForecastError::ValueConstraintViolation(violations)) => {
            let found: Vec<(usize, RuleViolation)> =
                violations.iter().map(|v| (v.index, v.violation)).collect();
            assert_eq!(
                found,
                vec![(2, RuleViolation::Negative), (3, RuleViolation::NotInteger)]
            );
        }
        other => panic!("expected ValueConstraintViolation, got {:?}", other),
    }
    assert!(service.predictions().is_empty().unwrap());
}

#[test]
fn test_request_validation_collects_fields() {
    let service = service();
    let mut request = stored_request(Scope::College(404), Metric::Revenue, Granularity::Yearly, 21);
    request.title = "   ".to_string();

    match service.create(OWNER, request) {
        Err(ForecastError::Validation(errors)) => {
            assert_eq!(errors.field("title"), ["is required".to_string()]);
            assert_eq!(errors.field("future_steps"), ["must be between 1 and 20".to_string()]);
            assert_eq!(errors.field("scope_id"), ["college 404 does not exist".to_string()]);
        }
        other => panic!("expected Validation, got {:?}", other),
    }
    assert!(service.predictions().is_empty().unwrap());
}

#[test]
fn test_default_future_steps() {
    let service = service();
    let mut request = manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly);
    request.future_steps = None;
    let report = service.create(OWNER, request).unwrap();
    assert_eq!(report.prediction.future_steps, 3);
    assert_eq!(report.forecasts.len(), 3);
}

#[test]
fn test_weekly_labels() {
    let service = service();
    let points = vec![
        InputPoint::new(70.0, date(2024, 12, 16)),
        InputPoint::new(75.0, date(2024, 12, 23)),
    ];
    let report = service
        .create(OWNER, manual_request(SeriesType::StudentPerformance, points, Granularity::Weekly))
        .unwrap();

    assert_eq!(report.forecasts[0].period, date(2024, 12, 30));
    assert_eq!(report.labeled[0].label, "Week 1 - 2025");
    assert_eq!(report.labeled[1].label, "Week 2 - 2025");
    assert_eq!(report.labeled[1].value, 85.0);
}

#[test]
fn test_update_metadata_only_keeps_forecasts() {
    let service = service();
    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 4.0, 2.0]), Granularity::Yearly),
        )
        .unwrap();

    let updated = service
        .update(
            OWNER,
            created.prediction.id,
            UpdatePrediction {
                title: Some("Renamed".to_string()),
                description: Some(Some("notes".to_string())),
                future_steps: Some(created.prediction.future_steps),
                ..UpdatePrediction::default()
            },
        )
        .unwrap();

    assert_eq!(updated.prediction.title, "Renamed");
    assert_eq!(updated.prediction.description.as_deref(), Some("notes"));
    assert_eq!(updated.observations, created.observations);
    assert_eq!(updated.forecasts, created.forecasts);
}

#[test]
fn test_update_steps_recomputes() {
    let service = service();
    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[10.0, 20.0, 30.0, 40.0]), Granularity::Yearly),
        )
        .unwrap();

    let updated = service
        .update(
            OWNER,
            created.prediction.id,
            UpdatePrediction {
                future_steps: Some(4),
                ..UpdatePrediction::default()
            },
        )
        .unwrap();

    assert_eq!(predicted(&updated), vec![50.0, 60.0, 70.0, 80.0]);
    assert_eq!(updated.forecasts[3].index, 8);
    assert_eq!(updated.observations, created.observations);
}

#[test]
fn test_refresh_is_idempotent() {
    let service = service();
    let created = service
        .create(
            OWNER,
            stored_request(Scope::University, Metric::Revenue, Granularity::Yearly, 5),
        )
        .unwrap();

    let refreshed = service
        .update(
            OWNER,
            created.prediction.id,
            UpdatePrediction {
                refresh: true,
                ..UpdatePrediction::default()
            },
        )
        .unwrap();

    assert_eq!(refreshed.observations, created.observations);
    assert_eq!(refreshed.forecasts, created.forecasts);
}

#[test]
fn test_update_replaces_manual_series() {
    let service = service();
    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
        )
        .unwrap();

    let updated = service
        .update(
            OWNER,
            created.prediction.id,
            UpdatePrediction {
                points: Some(vec![
                    InputPoint::new(10.0, date(2010, 1, 1)),
                    InputPoint::new(20.0, date(2010, 2, 1)),
                    InputPoint::new(10.0, date(2010, 3, 1)),
                ]),
                granularity: Some(Granularity::Monthly),
                ..UpdatePrediction::default()
            },
        )
        .unwrap();

    assert_eq!(updated.observations.len(), 3);
    assert_eq!(updated.prediction.start_date, Some(date(2010, 1, 1)));
    assert_eq!(updated.forecasts[0].predicted_value, 13.33);
    assert_eq!(updated.forecasts[0].period, date(2010, 4, 1));
    assert_eq!(updated.labeled[0].label, "2010-04");
}

#[test]
fn test_update_rejects_points_for_stored_prediction() {
    let service = service();
    let created = service
        .create(
            OWNER,
            stored_request(Scope::University, Metric::Revenue, Granularity::Yearly, 2),
        )
        .unwrap();

    let result = service.update(
        OWNER,
        created.prediction.id,
        UpdatePrediction {
            points: Some(yearly_points(&[1.0, 2.0])),
            ..UpdatePrediction::default()
        },
    );
    match result {
        Err(ForecastError::Validation(errors)) => assert_eq!(errors.field("points").len(), 1),
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn test_update_granularity_rebuilds_stored_series() {
    let service = service();
    let created = service
        .create(
            OWNER,
            stored_request(Scope::College(2), Metric::Revenue, Granularity::Yearly, 2),
        )
        .unwrap();
    assert_eq!(created.observations.len(), 3);

    let updated = service
        .update(
            OWNER,
            created.prediction.id,
            UpdatePrediction {
                granularity: Some(Granularity::Monthly),
                ..UpdatePrediction::default()
            },
        )
        .unwrap();

    assert_eq!(updated.prediction.granularity, Granularity::Monthly);
    assert_eq!(updated.observations.len(), 36);
    assert_eq!(updated.forecasts[0].period, date(2024, 1, 1));
    // revenue rises then falls across the months, so the window mean is used
    assert_eq!(predicted(&updated), vec![102.78, 103.32]);

    let invalid = service.update(
        OWNER,
        created.prediction.id,
        UpdatePrediction {
            granularity: Some(Granularity::Weekly),
            ..UpdatePrediction::default()
        },
    );
    assert!(matches!(invalid, Err(ForecastError::InvalidCombination { .. })));
}

#[test]
fn test_refresh_without_enough_data_changes_nothing() {
    let service = service();
    let created = service
        .create(
            OWNER,
            stored_request(Scope::College(2), Metric::Students, Granularity::Yearly, 2),
        )
        .unwrap();

    service.stats().remove_college(2).unwrap();

    let result = service.update(
        OWNER,
        created.prediction.id,
        UpdatePrediction {
            title: Some("Should not stick".to_string()),
            refresh: true,
            ..UpdatePrediction::default()
        },
    );
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientData { actual: 0, .. })
    ));

    let stored = service.show(OWNER, created.prediction.id).unwrap();
    assert_eq!(stored, created);
}

#[test]
fn test_other_owners_get_not_found() {
    let service = service();
    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
        )
        .unwrap();
    let id = created.prediction.id;

    assert!(matches!(service.show(STRANGER, id), Err(ForecastError::NotFound { .. })));
    assert!(matches!(
        service.update(STRANGER, id, UpdatePrediction::default()),
        Err(ForecastError::NotFound { .. })
    ));
    assert!(matches!(service.delete(STRANGER, id), Err(ForecastError::NotFound { .. })));
    assert!(matches!(service.show(OWNER, 12345), Err(ForecastError::NotFound { id: 12345 })));
    assert!(service.show(OWNER, id).is_ok());
}

#[test]
fn test_delete_removes_everything() {
    let service = service();
    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
        )
        .unwrap();

    service.delete(OWNER, created.prediction.id).unwrap();
    assert!(service.history(OWNER).unwrap().is_empty());
    assert!(service
        .predictions()
        .find(OWNER, created.prediction.id)
        .unwrap()
        .is_none());
    assert!(matches!(
        service.delete(OWNER, created.prediction.id),
        Err(ForecastError::NotFound { .. })
    ));
}

#[test]
fn test_history_is_newest_first_and_owner_scoped() {
    let service = service();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let report = service
            .create(
                OWNER,
                manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
            )
            .unwrap();
        ids.push(report.prediction.id);
    }
    service
        .create(
            STRANGER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0]), Granularity::Yearly),
        )
        .unwrap();

    let history: Vec<PredictionId> = service
        .history(OWNER)
        .unwrap()
        .iter()
        .map(|r| r.prediction.id)
        .collect();
    ids.reverse();
    assert_eq!(history, ids);
}

#[test]
fn test_available_periods() {
    let service = service();
    let periods = service
        .available_periods(Scope::College(3), Metric::Expenses, Granularity::Monthly)
        .unwrap();
    let labels: Vec<&str> = periods.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["2021-01", "2022-01", "2023-01"]);
    assert_eq!(periods[2].value, 1_100.0);

    assert!(matches!(
        service.available_periods(Scope::College(3), Metric::Expenses, Granularity::Yearly),
        Err(ForecastError::InvalidCombination { .. })
    ));
    assert!(matches!(
        service.available_periods(Scope::College(9), Metric::Revenue, Granularity::Yearly),
        Err(ForecastError::Validation(_))
    ));
}

#[test]
fn test_report_serialises_for_transport() {
    let service = service();
    let report = service
        .create(
            OWNER,
            stored_request(Scope::College(1), Metric::Revenue, Granularity::Yearly, 1),
        )
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["prediction"]["source"]["source"], "stored");
    assert_eq!(json["prediction"]["source"]["scope"]["scope_type"], "college");
    assert_eq!(json["prediction"]["source"]["metric"], "revenue");
    assert_eq!(json["prediction"]["granularity"], "yearly");
    assert_eq!(json["labeled"][0]["label"], "2024");
    assert_eq!(json["labeled"][0]["value"], 12_000.0);
    assert!(matches!(
        report.prediction.source,
        PredictionSource::Stored { .. }
    ));
}

/// Store whose writes can be switched off
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryPredictionStore,
    fail_writes: AtomicBool,
}

impl PredictionStore for FlakyStore {
    fn allocate_id(&self) -> StoreResult<PredictionId> {
        self.inner.allocate_id()
    }

    fn find(&self, owner: OwnerId, id: PredictionId) -> StoreResult<Option<PredictionRecord>> {
        self.inner.find(owner, id)
    }

    fn list(&self, owner: OwnerId) -> StoreResult<Vec<PredictionRecord>> {
        self.inner.list(owner)
    }

    fn save(&self, record: PredictionRecord) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.save(record)
    }

    fn delete(&self, owner: OwnerId, id: PredictionId) -> StoreResult<bool> {
        self.inner.delete(owner, id)
    }
}

#[test]
fn test_storage_failures_are_internal_and_leave_no_partial_state() {
    init_logging();
    let service = PredictionService::new(
        FlakyStore::default(),
        stats(),
        calendar(),
        EngineConfig::default(),
    )
    .unwrap();

    let created = service
        .create(
            OWNER,
            manual_request(SeriesType::Generic, yearly_points(&[1.0, 2.0, 3.0]), Granularity::Yearly),
        )
        .unwrap();

    service.predictions().fail_writes.store(true, Ordering::SeqCst);

    let failed_create = service.create(
        OWNER,
        manual_request(SeriesType::Generic, yearly_points(&[5.0, 6.0]), Granularity::Yearly),
    );
    match failed_create {
        Err(ForecastError::Internal(message)) => assert_eq!(message, "failed to create prediction"),
        other => panic!("expected Internal, got {:?}", other),
    }

    let failed_update = service.update(
        OWNER,
        created.prediction.id,
        UpdatePrediction {
            future_steps: Some(10),
            ..UpdatePrediction::default()
        },
    );
    assert!(matches!(failed_update, Err(ForecastError::Internal(_))));

    service.predictions().fail_writes.store(false, Ordering::SeqCst);
    let history = service.history(OWNER).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], created);
}

#[test]
fn test_stats_source_is_object_safe() {
    let stats = stats();
    let source: &dyn StatsSource = &stats;
    let series = campus_forecast::SeriesBuilder::new(source)
        .build(Scope::University, Metric::Revenue, Granularity::Yearly)
        .unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].value, 8_000.0);
}
