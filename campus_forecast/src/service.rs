//! Prediction service
//!
//! Entry point for the surrounding application. A create or recompute
//! builds the complete new record first and persists it with a single
//! `save`; a failure at any step leaves the store as it was.

use crate::bounds;
use crate::calendar::Calendar;
use crate::config::EngineConfig;
use crate::error::{ForecastError, Result, ValidationErrors};
use crate::model::{
    College, CreatePrediction, ForecastPoint, Granularity, InputPoint, LabeledPoint, Metric,
    Observation, OwnerId, Prediction, PredictionId, PredictionInput, PredictionRecord,
    PredictionReport, PredictionSource, Scope, SeriesPoint, UpdatePrediction,
};
use crate::rules::{check_points, SeriesType};
use crate::series::SeriesBuilder;
use crate::store::{PredictionStore, StatsSource};
use forecast_math::{classify, extrapolate};

/// Creates, recomputes, lists and deletes predictions
#[derive(Debug)]
pub struct PredictionService<P, S, C> {
    predictions: P,
    stats: S,
    calendar: C,
    config: EngineConfig,
}

impl<P, S, C> PredictionService<P, S, C>
where
    P: PredictionStore,
    S: StatsSource,
    C: Calendar,
{
    pub fn new(predictions: P, stats: S, calendar: C, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            predictions,
            stats,
            calendar,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn predictions(&self) -> &P {
        &self.predictions
    }

    pub fn stats(&self) -> &S {
        &self.stats
    }

    /// Create a prediction and compute its forecast
    pub fn create(&self, owner: OwnerId, request: CreatePrediction) -> Result<PredictionReport> {
        finish("create prediction", self.create_record(owner, request))
    }

    /// Apply metadata changes and recompute when the numeric inputs changed
    pub fn update(
        &self,
        owner: OwnerId,
        id: PredictionId,
        request: UpdatePrediction,
    ) -> Result<PredictionReport> {
        finish("update prediction", self.update_record(owner, id, request))
    }

    /// Remove a prediction with its observations and forecast points
    pub fn delete(&self, owner: OwnerId, id: PredictionId) -> Result<()> {
        finish("delete prediction", self.delete_record(owner, id))
    }

    pub fn show(&self, owner: OwnerId, id: PredictionId) -> Result<PredictionReport> {
        finish(
            "show prediction",
            self.find_owned(owner, id).map(PredictionReport::from_record),
        )
    }

    /// All of an owner's predictions, newest first
    pub fn history(&self, owner: OwnerId) -> Result<Vec<PredictionReport>> {
        finish("list predictions", self.list_owned(owner))
    }

    /// Periods (with values) a stored-data forecast would be built from
    pub fn available_periods(
        &self,
        scope: Scope,
        metric: Metric,
        granularity: Granularity,
    ) -> Result<Vec<LabeledPoint>> {
        finish(
            "list available periods",
            self.labeled_series(scope, metric, granularity),
        )
    }

    fn create_record(&self, owner: OwnerId, request: CreatePrediction) -> Result<PredictionReport> {
        let granularity = request.granularity;
        let future_steps = request
            .future_steps
            .unwrap_or(self.config.default_future_steps);

        if let PredictionInput::Stored { metric, .. } = &request.input {
            check_combination(*metric, granularity)?;
        }

        let mut errors = ValidationErrors::new();
        self.check_title(&request.title, &mut errors);
        self.check_steps(future_steps, &mut errors);
        let college = match &request.input {
            PredictionInput::Stored { scope, .. } => self.resolve_scope(*scope, &mut errors)?,
            PredictionInput::Points { .. } => None,
        };
        errors.into_result()?;

        let (source, series) = match request.input {
            PredictionInput::Stored { scope, metric } => (
                PredictionSource::Stored { scope, metric },
                self.stored_series(scope, metric, granularity)?,
            ),
            PredictionInput::Points {
                series_type,
                points,
            } => (
                PredictionSource::Manual { series_type },
                self.manual_series(series_type, points)?,
            ),
        };

        let observations = number_observations(&series);
        let forecasts = self.forecast(
            &source,
            college.as_ref(),
            &observations,
            granularity,
            future_steps,
        )?;

        let now = self.calendar.now();
        let id = self.predictions.allocate_id()?;
        let record = PredictionRecord {
            prediction: Prediction {
                id,
                owner_id: owner,
                title: request.title.trim().to_string(),
                description: request.description,
                source,
                granularity,
                future_steps,
                start_date: observations.first().map(|o| o.period),
                created_at: now,
                updated_at: now,
            },
            observations,
            forecasts,
        };

        self.predictions.save(record.clone())?;
        log::info!(
            "Created prediction {} for owner {} ({} observations, {} forecast points)",
            id,
            owner,
            record.observations.len(),
            record.forecasts.len()
        );

        Ok(PredictionReport::from_record(record))
    }

    fn update_record(
        &self,
        owner: OwnerId,
        id: PredictionId,
        request: UpdatePrediction,
    ) -> Result<PredictionReport> {
        let mut record = self.find_owned(owner, id)?;
        let source = record.prediction.source;

        let granularity = request.granularity.unwrap_or(record.prediction.granularity);
        let future_steps = request.future_steps.unwrap_or(record.prediction.future_steps);
        let granularity_changed = granularity != record.prediction.granularity;
        let steps_changed = future_steps != record.prediction.future_steps;

        if let PredictionSource::Stored { metric, .. } = source {
            if granularity_changed {
                check_combination(metric, granularity)?;
            }
        }

        let mut errors = ValidationErrors::new();
        if let Some(title) = &request.title {
            self.check_title(title, &mut errors);
        }
        if request.future_steps.is_some() {
            self.check_steps(future_steps, &mut errors);
        }
        if request.points.is_some() && matches!(source, PredictionSource::Stored { .. }) {
            errors.add(
                "points",
                "cannot be supplied for a prediction built from stored data",
            );
        }
        errors.into_result()?;

        let new_series = match (source, request.points) {
            (PredictionSource::Manual { series_type }, Some(points)) => {
                Some(self.manual_series(series_type, points)?)
            }
            (PredictionSource::Stored { scope, metric }, None)
                if granularity_changed || request.refresh =>
            {
                Some(self.stored_series(scope, metric, granularity)?)
            }
            _ => None,
        };

        let recompute = new_series.is_some() || granularity_changed || steps_changed || request.refresh;

        if let Some(series) = new_series {
            record.observations = number_observations(&series);
        }

        if recompute {
            self.require_points(record.observations.len())?;
            let college = match source {
                PredictionSource::Stored { scope, .. } => {
                    let mut errors = ValidationErrors::new();
                    let college = self.resolve_scope(scope, &mut errors)?;
                    errors.into_result()?;
                    college
                }
                PredictionSource::Manual { .. } => None,
            };
            record.forecasts = self.forecast(
                &source,
                college.as_ref(),
                &record.observations,
                granularity,
                future_steps,
            )?;
        }

        let prediction = &mut record.prediction;
        if let Some(title) = request.title {
            prediction.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            prediction.description = description;
        }
        prediction.granularity = granularity;
        prediction.future_steps = future_steps;
        prediction.start_date = record.observations.first().map(|o| o.period);
        prediction.updated_at = self.calendar.now();

        self.predictions.save(record.clone())?;
        log::info!(
            "Updated prediction {} for owner {}{}",
            id,
            owner,
            if recompute { " (forecast recomputed)" } else { "" }
        );

        Ok(PredictionReport::from_record(record))
    }

    fn delete_record(&self, owner: OwnerId, id: PredictionId) -> Result<()> {
        if !self.predictions.delete(owner, id)? {
            return Err(ForecastError::NotFound { id });
        }
        log::info!("Deleted prediction {} for owner {}", id, owner);
        Ok(())
    }

    fn find_owned(&self, owner: OwnerId, id: PredictionId) -> Result<PredictionRecord> {
        self.predictions
            .find(owner, id)?
            .ok_or(ForecastError::NotFound { id })
    }

    fn list_owned(&self, owner: OwnerId) -> Result<Vec<PredictionReport>> {
        let mut records = self.predictions.list(owner)?;
        records.sort_by(|a, b| {
            b.prediction
                .created_at
                .cmp(&a.prediction.created_at)
                .then(b.prediction.id.cmp(&a.prediction.id))
        });
        Ok(records.into_iter().map(PredictionReport::from_record).collect())
    }

    fn labeled_series(
        &self,
        scope: Scope,
        metric: Metric,
        granularity: Granularity,
    ) -> Result<Vec<LabeledPoint>> {
        check_combination(metric, granularity)?;
        let mut errors = ValidationErrors::new();
        self.resolve_scope(scope, &mut errors)?;
        errors.into_result()?;

        Ok(SeriesBuilder::new(&self.stats)
            .build(scope, metric, granularity)?
            .into_iter()
            .map(|point| LabeledPoint {
                label: granularity.label(point.period),
                date: point.period,
                value: point.value,
            })
            .collect())
    }

    fn check_title(&self, title: &str, errors: &mut ValidationErrors) {
        let title = title.trim();
        if title.is_empty() {
            errors.add("title", "is required");
        } else if title.chars().count() > self.config.max_title_len {
            errors.add(
                "title",
                format!("must not exceed {} characters", self.config.max_title_len),
            );
        }
    }

    fn check_steps(&self, future_steps: usize, errors: &mut ValidationErrors) {
        if future_steps == 0 || future_steps > self.config.max_future_steps {
            errors.add(
                "future_steps",
                format!("must be between 1 and {}", self.config.max_future_steps),
            );
        }
    }

    /// The college a scope refers to; records a field error when it is missing
    fn resolve_scope(&self, scope: Scope, errors: &mut ValidationErrors) -> Result<Option<College>> {
        match scope {
            Scope::College(id) => {
                let college = self.stats.college(id)?;
                if college.is_none() {
                    errors.add("scope_id", format!("college {} does not exist", id));
                }
                Ok(college)
            }
            Scope::University => Ok(None),
        }
    }

    fn require_points(&self, actual: usize) -> Result<()> {
        if actual < self.config.min_points {
            log::warn!(
                "Rejecting forecast: {} points available, {} required",
                actual,
                self.config.min_points
            );
            return Err(ForecastError::InsufficientData {
                required: self.config.min_points,
                actual,
            });
        }
        Ok(())
    }

    fn stored_series(
        &self,
        scope: Scope,
        metric: Metric,
        granularity: Granularity,
    ) -> Result<Vec<SeriesPoint>> {
        let series = SeriesBuilder::new(&self.stats).build(scope, metric, granularity)?;
        self.require_points(series.len())?;
        Ok(series)
    }

    fn manual_series(
        &self,
        series_type: SeriesType,
        mut points: Vec<InputPoint>,
    ) -> Result<Vec<SeriesPoint>> {
        points.sort_by_key(|point| point.period);

        let violations = check_points(series_type, &points);
        if !violations.is_empty() {
            return Err(ForecastError::ValueConstraintViolation(violations));
        }
        self.require_points(points.len())?;

        Ok(points
            .into_iter()
            .map(|point| SeriesPoint {
                period: point.period,
                value: point.value,
            })
            .collect())
    }

    fn forecast(
        &self,
        source: &PredictionSource,
        college: Option<&College>,
        observations: &[Observation],
        granularity: Granularity,
        future_steps: usize,
    ) -> Result<Vec<ForecastPoint>> {
        let last = observations.last().ok_or(ForecastError::InsufficientData {
            required: self.config.min_points,
            actual: 0,
        })?;
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
        log::debug!(
            "Extrapolating {} steps from {} values ({})",
            future_steps,
            values.len(),
            classify(&values).as_str()
        );

        let raw = extrapolate(&values, future_steps)?;

        raw.into_iter()
            .enumerate()
            .map(|(offset, value)| -> Result<ForecastPoint> {
                let step = offset + 1;
                let predicted_value = match source {
                    PredictionSource::Stored { metric, .. } => {
                        bounds::clamp(*metric, granularity, college, value)
                    }
                    PredictionSource::Manual { .. } => value,
                };
                let period = u32::try_from(step)
                    .ok()
                    .and_then(|step| self.calendar.advance(last.period, granularity, step))
                    .ok_or_else(|| {
                        ForecastError::Internal(format!(
                            "Cannot advance {} by {} {} steps",
                            last.period, step, granularity
                        ))
                    })?;

                Ok(ForecastPoint {
                    index: last.index + step,
                    predicted_value,
                    period,
                })
            })
            .collect()
    }
}

fn check_combination(metric: Metric, granularity: Granularity) -> Result<()> {
    if metric.supports(granularity) {
        Ok(())
    } else {
        Err(ForecastError::InvalidCombination {
            metric,
            granularity,
        })
    }
}

fn number_observations(series: &[SeriesPoint]) -> Vec<Observation> {
    series
        .iter()
        .enumerate()
        .map(|(position, point)| Observation {
            index: position + 1,
            value: point.value,
            period: point.period,
        })
        .collect()
}

/// Log the outcome and hide internal details from the caller
fn finish<T>(operation: &str, result: Result<T>) -> Result<T> {
    match result {
        Err(err) if err.is_internal() => {
            log::error!("Failed to {}: {}", operation, err);
            Err(ForecastError::Internal(format!("failed to {}", operation)))
        }
        Err(err) => {
            log::debug!("Rejected request to {}: {}", operation, err);
            Err(err)
        }
        ok => ok,
    }
}
