//! Organization, team, settings, finance and reporting routes.

use super::{AppState, CurrentUser, Json, OrgMember, Path, Query};
use crate::app::finance::{FinanceFilter, FinanceUseCase};
use crate::app::invites::InvitesUseCase;
use crate::app::organizations::{OrganizationWithRole, OrganizationsUseCase};
use crate::app::reports::{ExportDataset, ReportsUseCase};
use crate::app::settings::SettingsUseCase;
use crate::calendar::CalendarEntry;
use crate::compliance::ComplianceReport;
use crate::domain::{FinancialRecord, Membership, NewFinancialRecord, Organization, OrganizationSettings, Role, TeamInvite};
use crate::error::{FarmError, Result};
use crate::finance::FinancialSummary;
use crate::metrics::record_write;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days shown when the calendar is requested without an explicit end.
const DEFAULT_CALENDAR_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
pub struct NewOrganization {
    name: String,
}

pub async fn list_orgs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<OrganizationWithRole>>> {
    Ok(Json(OrganizationsUseCase::new(state.storage).list_for_user(user.id).await?))
}

pub async fn create_org(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewOrganization>,
) -> Result<(StatusCode, Json<Organization>)> {
    let organization = OrganizationsUseCase::new(state.storage).create(&body.name, &user).await?;
    record_write("organizations");
    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn members(State(state): State<AppState>, member: OrgMember) -> Result<Json<Vec<Membership>>> {
    Ok(Json(OrganizationsUseCase::new(state.storage).members(member.organization_id).await?))
}

/// Invite as shown to clients; the token hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct InviteView {
    id: Uuid,
    organization_id: Uuid,
    email: String,
    role: Role,
    invited_by: Uuid,
    expires_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TeamInvite> for InviteView {
    fn from(invite: TeamInvite) -> Self {
        Self {
            id: invite.id,
            organization_id: invite.organization_id,
            email: invite.email,
            role: invite.role,
            invited_by: invite.invited_by,
            expires_at: invite.expires_at,
            accepted_at: invite.accepted_at,
            created_at: invite.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewInvite {
    email: String,
    role: Role,
}

#[derive(Debug, Serialize)]
pub struct CreatedInviteView {
    invite: InviteView,
    token: String,
    accept_url: String,
}

pub async fn list_invites(State(state): State<AppState>, member: OrgMember) -> Result<Json<Vec<InviteView>>> {
    member.require_team()?;
    let invites = InvitesUseCase::new(state.storage).list(member.organization_id).await?;
    Ok(Json(invites.into_iter().map(InviteView::from).collect()))
}

pub async fn create_invite(
    State(state): State<AppState>,
    member: OrgMember,
    Json(body): Json<NewInvite>,
) -> Result<(StatusCode, Json<CreatedInviteView>)> {
    member.require_team()?;
    let created = InvitesUseCase::new(state.storage)
        .create(member.organization_id, &body.email, body.role, member.user.id)
        .await?;
    record_write("invites");
    let accept_url = format!("{}/invite?token={}", state.app_base_url.trim_end_matches('/'), created.token);
    Ok((
        StatusCode::CREATED,
        Json(CreatedInviteView { invite: created.invite.into(), token: created.token, accept_url }),
    ))
}

pub async fn revoke_invite(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    member.require_team()?;
    InvitesUseCase::new(state.storage).revoke(member.organization_id, id).await?;
    record_write("invites");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvite {
    token: String,
}

pub async fn accept_invite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<AcceptInvite>,
) -> Result<Json<Membership>> {
    let membership = InvitesUseCase::new(state.storage).accept(&body.token, &user).await?;
    record_write("memberships");
    Ok(Json(membership))
}

pub async fn get_settings(State(state): State<AppState>, member: OrgMember) -> Result<Json<OrganizationSettings>> {
    Ok(Json(SettingsUseCase::new(state.storage).get(member.organization_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    member: OrgMember,
    Json(settings): Json<OrganizationSettings>,
) -> Result<Json<OrganizationSettings>> {
    member.require_team()?;
    let saved = SettingsUseCase::new(state.storage)
        .update(member.organization_id, settings)
        .await?;
    record_write("settings");
    Ok(Json(saved))
}

pub async fn list_finance(
    State(state): State<AppState>,
    member: OrgMember,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<Vec<FinancialRecord>>> {
    member.require_finance()?;
    Ok(Json(FinanceUseCase::new(state.storage).list(member.organization_id, filter).await?))
}

pub async fn record_finance(
    State(state): State<AppState>,
    member: OrgMember,
    Json(new): Json<NewFinancialRecord>,
) -> Result<(StatusCode, Json<FinancialRecord>)> {
    member.require_finance()?;
    member.require_write()?;
    let record = FinanceUseCase::new(state.storage).record(member.organization_id, new).await?;
    record_write("financial_records");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn finance_summary(
    State(state): State<AppState>,
    member: OrgMember,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<FinancialSummary>> {
    member.require_finance()?;
    Ok(Json(FinanceUseCase::new(state.storage).summary(member.organization_id, filter).await?))
}

pub async fn delete_finance(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    member.require_finance()?;
    member.require_write()?;
    FinanceUseCase::new(state.storage).delete(member.organization_id, id).await?;
    record_write("financial_records");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

pub async fn calendar(
    State(state): State<AppState>,
    member: OrgMember,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarEntry>>> {
    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
    let to = match query.to {
        Some(to) => to,
        None => from
            .checked_add_signed(Duration::days(DEFAULT_CALENDAR_DAYS))
            .ok_or_else(|| FarmError::validation("from", "is out of range"))?,
    };
    Ok(Json(ReportsUseCase::new(state.storage).calendar(member.organization_id, from, to).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ComplianceQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

pub async fn compliance(
    State(state): State<AppState>,
    member: OrgMember,
    Query(query): Query<ComplianceQuery>,
) -> Result<Json<ComplianceReport>> {
    let report = ReportsUseCase::new(state.storage)
        .compliance(member.organization_id, query.from, query.to)
        .await?;
    Ok(Json(report))
}

pub async fn export(
    State(state): State<AppState>,
    member: OrgMember,
    Path((_, dataset)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse> {
    let dataset: ExportDataset = dataset.parse()?;
    if dataset == ExportDataset::Finance {
        member.require_finance()?;
    }
    let csv = ReportsUseCase::new(state.storage).export(member.organization_id, dataset).await?;
    let disposition = format!("attachment; filename=\"{}\"", dataset.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
