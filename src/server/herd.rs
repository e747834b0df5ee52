//! Animals, breeding, farrowing, housing and health routes.

use super::{AppState, Json, OrgMember, Path, Query};
use crate::app::animals::AnimalsUseCase;
use crate::app::breeding::BreedingUseCase;
use crate::app::farrowing::FarrowingUseCase;
use crate::app::health::HealthUseCase;
use crate::app::housing::{HousingUseCase, UnitOccupancy};
use crate::domain::{
    Animal, AnimalKind, AnimalUpdate, BreedingRecord, Farrowing, FarrowingOutcome, HealthEvent, HousingAssignment,
    HousingUnit, NewAnimal, NewAssignment, NewBreeding, NewHealthEvent, NewHousingUnit, Weaning,
};
use crate::error::Result;
use crate::metrics::record_write;
use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AnimalQuery {
    kind: Option<AnimalKind>,
}

pub async fn list_animals(
    State(state): State<AppState>,
    member: OrgMember,
    Query(query): Query<AnimalQuery>,
) -> Result<Json<Vec<Animal>>> {
    let animals = AnimalsUseCase::new(state.storage).list(member.organization_id, query.kind).await?;
    Ok(Json(animals))
}

pub async fn create_animal(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewAnimal>,
) -> Result<(StatusCode, Json<Animal>)> {
    member.require_write()?;
    let animal = AnimalsUseCase::new(state.storage).create(member.organization_id, new).await?;
    record_write("animals");
    Ok((StatusCode::CREATED, Json(animal)))
}

pub async fn get_animal(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Animal>> {
    Ok(Json(AnimalsUseCase::new(state.storage).get(member.organization_id, id).await?))
}

pub async fn update_animal(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
    Json(update): Json<AnimalUpdate>,
) -> Result<Json<Animal>> {
    member.require_write()?;
    let animal = AnimalsUseCase::new(state.storage)
        .update(member.organization_id, id, update)
        .await?;
    record_write("animals");
    Ok(Json(animal))
}

pub async fn delete_animal(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    member.require_write()?;
    AnimalsUseCase::new(state.storage).delete(member.organization_id, id).await?;
    record_write("animals");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_breedings(State(state): State<AppState>, member: OrgMember) -> Result<Json<Vec<BreedingRecord>>> {
    Ok(Json(BreedingUseCase::new(state.storage).list(member.organization_id).await?))
}

pub async fn record_breeding(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewBreeding>,
) -> Result<(StatusCode, Json<BreedingRecord>)> {
    member.require_write()?;
    let record = BreedingUseCase::new(state.storage)
        .record(member.organization_id, new, member.user.id)
        .await?;
    record_write("breeding");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn confirm_pregnancy(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BreedingRecord>> {
    member.require_write()?;
    let record = BreedingUseCase::new(state.storage)
        .confirm_pregnancy(member.organization_id, id)
        .await?;
    record_write("breeding");
    Ok(Json(record))
}

pub async fn mark_not_pregnant(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BreedingRecord>> {
    member.require_write()?;
    let record = BreedingUseCase::new(state.storage)
        .mark_not_pregnant(member.organization_id, id)
        .await?;
    record_write("breeding");
    Ok(Json(record))
}

pub async fn list_farrowings(State(state): State<AppState>, member: OrgMember) -> Result<Json<Vec<Farrowing>>> {
    Ok(Json(FarrowingUseCase::new(state.storage).list(member.organization_id).await?))
}

pub async fn record_farrowing(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
    Json(outcome): Json<FarrowingOutcome>,
) -> Result<Json<Farrowing>> {
    member.require_write()?;
    let farrowing = FarrowingUseCase::new(state.storage)
        .record_outcome(member.organization_id, id, outcome)
        .await?;
    record_write("farrowings");
    Ok(Json(farrowing))
}

pub async fn record_weaning(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
    Json(weaning): Json<Weaning>,
) -> Result<Json<Farrowing>> {
    member.require_write()?;
    let farrowing = FarrowingUseCase::new(state.storage)
        .record_weaning(member.organization_id, id, weaning)
        .await?;
    record_write("farrowings");
    Ok(Json(farrowing))
}

pub async fn list_units(State(state): State<AppState>, member: OrgMember) -> Result<Json<Vec<UnitOccupancy>>> {
    Ok(Json(HousingUseCase::new(state.storage).list_units(member.organization_id).await?))
}

pub async fn create_unit(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewHousingUnit>,
) -> Result<(StatusCode, Json<HousingUnit>)> {
    member.require_write()?;
    let unit = HousingUseCase::new(state.storage).create_unit(member.organization_id, new).await?;
    record_write("housing_units");
    Ok((StatusCode::CREATED, Json(unit)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentQuery {
    #[serde(default)]
    open: bool,
}

pub async fn list_assignments(
    State(state): State<AppState>,
    member: OrgMember,
    Query(query): Query<AssignmentQuery>,
) -> Result<Json<Vec<HousingAssignment>>> {
    let assignments = HousingUseCase::new(state.storage)
        .list_assignments(member.organization_id, query.open)
        .await?;
    Ok(Json(assignments))
}

pub async fn assign_housing(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewAssignment>,
) -> Result<(StatusCode, Json<HousingAssignment>)> {
    member.require_write()?;
    let assignment = HousingUseCase::new(state.storage).assign(member.organization_id, new).await?;
    record_write("housing_assignments");
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[derive(Debug, Default, Deserialize)]
pub struct EndAssignment {
    end_at: Option<DateTime<Utc>>,
}

pub async fn end_assignment(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
    body: Option<Json<EndAssignment>>,
) -> Result<Json<HousingAssignment>> {
    member.require_write()?;
    let end_at = body.and_then(|Json(b)| b.end_at);
    let assignment = HousingUseCase::new(state.storage)
        .end_assignment(member.organization_id, id, end_at)
        .await?;
    record_write("housing_assignments");
    Ok(Json(assignment))
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    animal_id: Option<Uuid>,
}

pub async fn list_health(
    State(state): State<AppState>,
    member: OrgMember,
    Query(query): Query<HealthQuery>,
) -> Result<Json<Vec<HealthEvent>>> {
    let events = HealthUseCase::new(state.storage)
        .list(member.organization_id, query.animal_id)
        .await?;
    Ok(Json(events))
}

pub async fn record_health(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewHealthEvent>,
) -> Result<(StatusCode, Json<HealthEvent>)> {
    member.require_write()?;
    let event = HealthUseCase::new(state.storage).record(member.organization_id, new).await?;
    record_write("health_events");
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn delete_health(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    member.require_write()?;
    HealthUseCase::new(state.storage).delete(member.organization_id, id).await?;
    record_write("health_events");
    Ok(StatusCode::NO_CONTENT)
}
