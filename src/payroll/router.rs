use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::assembly::PaymentAssembler;
use super::blueprint::PayPlanBlueprint;
use super::domain::{PayPeriod, PaymentRecord, PeriodId};
use super::ingest::{ImportOptions, ImportReport, ScheduleImportError, ScheduleImporter};
use super::report::PayrollRunReport;
use super::repository::{
    ClassStore, FormulaStore, InstructorStore, Page, PaymentStore, StoreError,
};
use super::settings::PayrollSettings;

/// Facade bundling the assembler, importer, and standard plan behind one
/// state value for the HTTP surface and the CLI.
pub struct PayrollApi<F, C, I, P> {
    assembler: PaymentAssembler<F, C, I, P>,
    importer: ScheduleImporter<I, C>,
    formulas: Arc<F>,
    payments: Arc<P>,
    blueprint: PayPlanBlueprint,
}

impl<F, C, I, P> PayrollApi<F, C, I, P>
where
    F: FormulaStore,
    C: ClassStore,
    I: InstructorStore,
    P: PaymentStore,
{
    pub fn new(
        formulas: Arc<F>,
        classes: Arc<C>,
        instructors: Arc<I>,
        payments: Arc<P>,
        settings: PayrollSettings,
    ) -> Self {
        let blueprint = PayPlanBlueprint::standard(&settings);
        let importer =
            ScheduleImporter::new(instructors.clone(), classes.clone(), settings.clone());
        let assembler = PaymentAssembler::new(
            formulas.clone(),
            classes,
            instructors,
            payments.clone(),
            settings,
        );

        Self {
            assembler,
            importer,
            formulas,
            payments,
            blueprint,
        }
    }

    pub fn import(
        &self,
        csv: &str,
        period: &PayPeriod,
        options: &ImportOptions,
    ) -> Result<ImportReport, ScheduleImportError> {
        self.importer
            .from_reader(Cursor::new(csv.as_bytes().to_vec()), period, options)
    }

    /// Runs payroll for the period, falling back to the standard pay plan
    /// for any discipline without an authored formula.
    pub fn run(&self, period: &PayPeriod) -> Result<PayrollRunReport, StoreError> {
        self.blueprint
            .seed_missing_formulas(self.formulas.as_ref(), &period.id)?;
        let ladders = self.blueprint.ladders(&period.id);
        self.assembler.run_period(period, &ladders)
    }

    pub fn list_payments(
        &self,
        period: &PeriodId,
        page: Page,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        self.payments.list(period, page)
    }

    pub fn duplicate_formulas(&self, from: &PeriodId, to: &PeriodId) -> Result<u32, StoreError> {
        self.formulas.duplicate(from, to)
    }

    pub fn list_formulas(
        &self,
        period: &PeriodId,
    ) -> Result<Vec<super::formula::StoredFormula>, StoreError> {
        self.formulas.list(period)
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub period_id: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

impl RunRequest {
    fn period(&self) -> PayPeriod {
        PayPeriod {
            id: PeriodId(self.period_id.clone()),
            starts_on: self.starts_on,
            ends_on: self.ends_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub period_id: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(default)]
    pub replace_weeks: bool,
    pub schedule_csv: String,
}

#[derive(Debug, Deserialize)]
pub struct DuplicateFormulasRequest {
    pub from_period: String,
    pub to_period: String,
}

/// Router builder exposing the payroll HTTP endpoints.
pub fn payroll_router<F, C, I, P>(api: Arc<PayrollApi<F, C, I, P>>) -> Router
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    Router::new()
        .route("/api/v1/payroll/runs", post(run_handler::<F, C, I, P>))
        .route(
            "/api/v1/payroll/imports",
            post(import_handler::<F, C, I, P>),
        )
        .route(
            "/api/v1/payroll/payments/:period_id",
            get(payments_handler::<F, C, I, P>),
        )
        .route(
            "/api/v1/payroll/payments/:period_id/:page",
            get(payments_page_handler::<F, C, I, P>),
        )
        .route(
            "/api/v1/payroll/formulas/:period_id",
            get(formulas_handler::<F, C, I, P>),
        )
        .route(
            "/api/v1/payroll/formulas/duplicate",
            post(duplicate_formulas_handler::<F, C, I, P>),
        )
        .with_state(api)
}

async fn run_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    axum::Json(request): axum::Json<RunRequest>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    match api.run(&request.period()) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn import_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    axum::Json(request): axum::Json<ImportRequest>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    let period = PayPeriod {
        id: PeriodId(request.period_id.clone()),
        starts_on: request.starts_on,
        ends_on: request.ends_on,
    };
    let options = ImportOptions {
        replace_weeks: request.replace_weeks,
        ..ImportOptions::default()
    };

    match api.import(&request.schedule_csv, &period, &options) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

async fn payments_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    Path(period_id): Path<String>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    payments_response(&api, PeriodId(period_id), Page::default())
}

async fn payments_page_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    Path((period_id, page)): Path<(String, usize)>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    let page = Page {
        number: page.max(1),
        ..Page::default()
    };
    payments_response(&api, PeriodId(period_id), page)
}

fn payments_response<F, C, I, P>(
    api: &PayrollApi<F, C, I, P>,
    period: PeriodId,
    page: Page,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    match api.list_payments(&period, page) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn formulas_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    Path(period_id): Path<String>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    match api.list_formulas(&PeriodId(period_id)) {
        Ok(formulas) => (StatusCode::OK, axum::Json(formulas)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn duplicate_formulas_handler<F, C, I, P>(
    State(api): State<Arc<PayrollApi<F, C, I, P>>>,
    axum::Json(request): axum::Json<DuplicateFormulasRequest>,
) -> Response
where
    F: FormulaStore + 'static,
    C: ClassStore + 'static,
    I: InstructorStore + 'static,
    P: PaymentStore + 'static,
{
    match api.duplicate_formulas(
        &PeriodId(request.from_period),
        &PeriodId(request.to_period),
    ) {
        Ok(copied) => (StatusCode::OK, axum::Json(json!({ "copied": copied }))).into_response(),
        Err(err) => store_error_response(err),
    }
}

fn store_error_response(err: StoreError) -> Response {
    let status = match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
