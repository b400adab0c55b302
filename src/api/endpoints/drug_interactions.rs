//! Drug interaction endpoints.
//!
//! - `POST /api/drug-interactions/check`: full interaction report
//! - `POST /api/drug-interactions/check-pair`: two named drugs
//! - `POST /api/drug-interactions/duplications`: therapeutic duplications
//! - `POST /api/drug-interactions/contraindications`: label screening
//! - `POST /api/drug-interactions/clinical-review`: report plus review
//! - `GET /api/drug-interactions/severity-levels`: severity tiers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::api::validation::{CheckRequest, PairRequest, ValidCheck};
use crate::clinical::InteractionCheckResult;
use crate::interactions::{severity_catalog, SeverityLevel};
use crate::models::{Medication, PatientContext};
use crate::report::{
    action_items, clinical_priorities, monitoring_plan, ActionItem, InteractionReport,
    MonitoringPlan, Priority,
};
use crate::safety::{
    find_therapeutic_duplications, AllergyAlert, ContraindicationAlert, TherapeuticDuplication,
};

/// The caller's drug name for a name used in an upstream lookup.
fn display_name(medications: &[Medication], lookup: &str) -> Option<String> {
    medications
        .iter()
        .find(|m| m.lookup_name().eq_ignore_ascii_case(lookup))
        .map(|m| m.drug_name.clone())
}

fn relabel(check: &mut InteractionCheckResult, medications: &[Medication]) {
    for resolved in &mut check.medications {
        if let Some(drug_name) = display_name(medications, &resolved.name) {
            resolved.name = drug_name;
        }
    }
    for name in &mut check.unresolved {
        if let Some(drug_name) = display_name(medications, name) {
            *name = drug_name;
        }
    }
}

fn relabel_alerts(alerts: &mut [ContraindicationAlert], medications: &[Medication]) {
    for alert in alerts {
        if let Some(drug_name) = display_name(medications, &alert.medication) {
            alert.medication = drug_name;
        }
    }
}

async fn build_report(ctx: &ApiContext, req: &ValidCheck) -> Result<InteractionReport, ApiError> {
    let names = req.lookup_names();
    let mut check = ctx.clinical.check_drug_interactions(&names).await?;
    relabel(&mut check, &req.medications);

    let mut contraindications = if req.conditions.is_empty() {
        Vec::new()
    } else {
        ctx.clinical
            .check_contraindications(&names, &req.conditions)
            .await
    };
    relabel_alerts(&mut contraindications, &req.medications);
    let duplications = find_therapeutic_duplications(&req.medications);

    Ok(InteractionReport::build(&check, contraindications, duplications))
}

/// `POST /api/drug-interactions/check`
pub async fn check(
    State(ctx): State<ApiContext>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InteractionReport>>, ApiError> {
    let Json(body) = body?;
    let req = body.validate()?;

    let report = build_report(&ctx, &req).await?;
    tracing::info!(
        medications = req.medications.len(),
        interactions = report.summary.total_interactions,
        risk = %report.summary.risk_level,
        "Interaction check completed"
    );

    Ok(Json(ApiResponse::with_message(
        report,
        "Drug interaction check completed",
    )))
}

/// `POST /api/drug-interactions/check-pair`
pub async fn check_pair(
    State(ctx): State<ApiContext>,
    body: Result<Json<PairRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InteractionReport>>, ApiError> {
    let Json(body) = body?;
    let (drug1, drug2) = body.validate()?;

    let check = ctx.clinical.check_drug_pair(&drug1, &drug2).await?;
    let report = InteractionReport::build(&check, Vec::new(), Vec::new());

    Ok(Json(ApiResponse::ok(report)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicationResponse {
    pub duplications: Vec<TherapeuticDuplication>,
    pub total: usize,
}

/// `POST /api/drug-interactions/duplications`
pub async fn duplications(
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DuplicationResponse>>, ApiError> {
    let Json(body) = body?;
    let req = body.validate()?;

    let duplications = find_therapeutic_duplications(&req.medications);
    Ok(Json(ApiResponse::ok(DuplicationResponse {
        total: duplications.len(),
        duplications,
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContraindicationResponse {
    pub contraindications: Vec<ContraindicationAlert>,
    pub total: usize,
}

/// `POST /api/drug-interactions/contraindications`
pub async fn contraindications(
    State(ctx): State<ApiContext>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ContraindicationResponse>>, ApiError> {
    let Json(body) = body?;
    let req = body.validate_with_conditions()?;

    let mut alerts = ctx
        .clinical
        .check_contraindications(&req.lookup_names(), &req.conditions)
        .await;
    relabel_alerts(&mut alerts, &req.medications);

    Ok(Json(ApiResponse::ok(ContraindicationResponse {
        total: alerts.len(),
        contraindications: alerts,
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalReview {
    pub report: InteractionReport,
    pub allergy_alerts: Vec<AllergyAlert>,
    pub clinical_priorities: Vec<Priority>,
    pub action_items: Vec<ActionItem>,
    pub monitoring_plan: MonitoringPlan,
    pub patient: PatientContext,
}

/// `POST /api/drug-interactions/clinical-review`
pub async fn clinical_review(
    State(ctx): State<ApiContext>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ClinicalReview>>, ApiError> {
    let Json(body) = body?;
    let req = body.validate()?;

    let report = build_report(&ctx, &req).await?;
    let allergy_alerts = ctx
        .clinical
        .check_drug_allergies(&req.medications, &req.allergies);

    let review = ClinicalReview {
        clinical_priorities: clinical_priorities(&report, &allergy_alerts),
        action_items: action_items(&report, &allergy_alerts, &req.patient),
        monitoring_plan: monitoring_plan(&report, &req.patient),
        report,
        allergy_alerts,
        patient: req.patient,
    };

    Ok(Json(ApiResponse::with_message(
        review,
        "Clinical review completed",
    )))
}

/// `GET /api/drug-interactions/severity-levels`
pub async fn severity_levels() -> Json<ApiResponse<Vec<SeverityLevel>>> {
    Json(ApiResponse::ok(severity_catalog()))
}
