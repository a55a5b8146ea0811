//! Leave applications (izin sakit / izin pulang) and the santri projection
//! they drive.
//!
//! ```text
//! create (santri | waliSantri)
//!   -> PendingUstadzahReview   --review (pengurus)-->    PendingUstadzahApproval | Rejected
//!   -> PendingUstadzahApproval --approve (ustadzah)-->   Approved | Rejected
//!   -> Approved                --mark_returned-->        Returned
//! ```

use crate::actor::Actor;
use crate::error::AppError;
use crate::events;
use crate::overdue::{self, Lateness};
use chrono::{DateTime, Utc};
use db::models::izin_approval::{self, Decision, Role};
use db::models::izin_sakit_pulang::{self, IzinStatus, IzinType};
use db::models::santri::{self, SantriLeaveStatus, StatusKehadiran};
use sea_orm::TransactionTrait;
use serde::Serialize;
use util::state::AppState;
use validator::Validate;

/// A leave application together with its ordered approval history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    #[serde(flatten)]
    pub izin: izin_sakit_pulang::Model,
    pub approvals: Vec<izin_approval::Model>,
}

impl LeaveApplication {
    pub fn id(&self) -> i64 {
        self.izin.id
    }

    pub fn status(&self) -> IzinStatus {
        self.izin.status
    }

    /// Only approved leaves that have not been closed by a return can be late.
    pub fn lateness(&self, now: DateTime<Utc>) -> Option<Lateness> {
        if self.izin.status != IzinStatus::Approved || self.izin.actual_return_date.is_some() {
            return None;
        }
        overdue::lateness(&now, &self.izin.requested_return_date)
    }
}

#[derive(Debug, Clone, Validate)]
pub struct CreateIzin {
    pub santri_id: i64,
    #[validate(length(min = 1, message = "Reason must not be empty"))]
    pub reason: String,
    pub izin_type: IzinType,
    pub leave_date: DateTime<Utc>,
    pub requested_return_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Review,
    Approval,
}

impl Stage {
    fn from(self) -> IzinStatus {
        match self {
            Stage::Review => IzinStatus::PendingUstadzahReview,
            Stage::Approval => IzinStatus::PendingUstadzahApproval,
        }
    }

    fn on_approve(self) -> IzinStatus {
        match self {
            Stage::Review => IzinStatus::PendingUstadzahApproval,
            Stage::Approval => IzinStatus::Approved,
        }
    }

    fn allows(self, role: Role) -> bool {
        match self {
            Stage::Review => role.is_reviewer(),
            Stage::Approval => role.is_approver(),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Stage::Review => "review",
            Stage::Approval => "approve",
        }
    }
}

fn kehadiran_for(izin_type: IzinType) -> StatusKehadiran {
    match izin_type {
        IzinType::Sick => StatusKehadiran::Sakit,
        IzinType::Pulang => StatusKehadiran::Pulang,
    }
}

pub struct IzinService {
    state: AppState,
}

impl IzinService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Deletion is allowed only while the application is still pending.
    pub fn can_delete(status: IzinStatus) -> bool {
        status.can_delete()
    }

    /// Files a new application in `PendingUstadzahReview`.
    ///
    /// # Arguments
    ///
    /// * `actor` - A santri or wali santri; recorded as the creator.
    /// * `params` - The reason is trimmed before validation and the return
    ///   date must not precede the leave date.
    pub async fn create_izin(
        &self,
        actor: Actor,
        mut params: CreateIzin,
    ) -> Result<LeaveApplication, AppError> {
        if !actor.role.can_submit_izin() {
            tracing::warn!(actor_id = actor.id, role = %actor.role, "Izin submission refused");
            return Err(AppError::Permission(format!(
                "{} cannot submit a leave application",
                actor.role
            )));
        }

        params.reason = params.reason.trim().to_owned();
        params.validate()?;
        if params.requested_return_date < params.leave_date {
            return Err(AppError::Validation(
                "Return date must not be before the leave date".into(),
            ));
        }

        let db = self.state.db();
        if santri::Model::find_by_id(db, params.santri_id).await?.is_none() {
            return Err(AppError::not_found("Santri", params.santri_id));
        }

        let izin = izin_sakit_pulang::Model::create(
            db,
            params.santri_id,
            actor.id,
            &params.reason,
            params.izin_type,
            params.leave_date,
            params.requested_return_date,
        )
        .await?;

        let application = LeaveApplication {
            izin,
            approvals: Vec::new(),
        };
        tracing::info!(
            izin_id = application.id(),
            santri_id = params.santri_id,
            izin_type = %params.izin_type,
            "Izin submitted"
        );
        events::izin_updated(self.state.feed(), &application).await;

        Ok(application)
    }

    /// Loads one application with its approvals, oldest decision first.
    pub async fn get_izin(&self, id: i64) -> Result<LeaveApplication, AppError> {
        let db = self.state.db();
        let izin = izin_sakit_pulang::Model::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::not_found("IzinSakitPulang", id))?;
        let approvals = izin_approval::Model::find_for_izin(db, id).await?;
        Ok(LeaveApplication { izin, approvals })
    }

    /// Newest first.
    pub async fn list_for_santri(&self, santri_id: i64) -> Result<Vec<LeaveApplication>, AppError> {
        let db = self.state.db();
        let mut applications = Vec::new();
        for izin in izin_sakit_pulang::Model::find_by_santri(db, santri_id).await? {
            let approvals = izin_approval::Model::find_for_izin(db, izin.id).await?;
            applications.push(LeaveApplication { izin, approvals });
        }
        Ok(applications)
    }

    /// Work queue for a stage, e.g. everything waiting on the reviewer.
    pub async fn list_by_status(
        &self,
        status: IzinStatus,
    ) -> Result<Vec<LeaveApplication>, AppError> {
        let db = self.state.db();
        let mut applications = Vec::new();
        for izin in izin_sakit_pulang::Model::find_by_status(db, status).await? {
            let approvals = izin_approval::Model::find_for_izin(db, izin.id).await?;
            applications.push(LeaveApplication { izin, approvals });
        }
        Ok(applications)
    }

    /// First decision, taken by the pengurus.
    pub async fn review(
        &self,
        id: i64,
        actor: Actor,
        decision: Decision,
    ) -> Result<LeaveApplication, AppError> {
        self.decide(id, actor, decision, Stage::Review).await
    }

    /// Final decision, taken by the ustadzah. Approval also writes the
    /// santri's `statusKepulangan` and is refused with `InvalidState` while
    /// the santri is still away on an earlier approved leave.
    pub async fn approve(
        &self,
        id: i64,
        actor: Actor,
        decision: Decision,
    ) -> Result<LeaveApplication, AppError> {
        self.decide(id, actor, decision, Stage::Approval).await
    }

    async fn decide(
        &self,
        id: i64,
        actor: Actor,
        decision: Decision,
        stage: Stage,
    ) -> Result<LeaveApplication, AppError> {
        let db = self.state.db();
        let izin = izin_sakit_pulang::Model::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::not_found("IzinSakitPulang", id))?;

        if !stage.allows(actor.role) {
            tracing::warn!(
                izin_id = id,
                actor_id = actor.id,
                role = %actor.role,
                "Izin decision refused"
            );
            return Err(AppError::Permission(format!(
                "{} cannot {} leave applications",
                actor.role,
                stage.verb()
            )));
        }

        let from = stage.from();
        if izin.status != from {
            tracing::warn!(izin_id = id, status = %izin.status, "Izin decision on wrong state");
            return Err(AppError::InvalidState(format!(
                "Leave application is {}, expected {from}",
                izin.status
            )));
        }

        let to = match decision {
            Decision::Approved => stage.on_approve(),
            Decision::Rejected => IzinStatus::Rejected,
        };
        let now = Utc::now();

        let txn = db.begin().await?;
        if to == IzinStatus::Approved {
            let holder = santri::Model::find_by_id(&txn, izin.santri_id)
                .await?
                .ok_or_else(|| AppError::not_found("Santri", izin.santri_id))?;
            if holder.is_away() {
                tracing::warn!(
                    izin_id = id,
                    santri_id = izin.santri_id,
                    "Approval while santri is still away refused"
                );
                return Err(AppError::InvalidState(
                    "Santri has not returned from a previous leave".into(),
                ));
            }
        }
        if !izin_sakit_pulang::Model::transition(&txn, id, from, to, None).await? {
            return Err(AppError::InvalidState(
                "Leave application was changed by someone else".into(),
            ));
        }
        izin_approval::Model::create(&txn, id, actor.role, actor.id, decision, now).await?;

        let projection = if to == IzinStatus::Approved {
            Some(
                santri::Model::record_departure(
                    &txn,
                    izin.santri_id,
                    kehadiran_for(izin.izin_type),
                    &izin.reason,
                    actor.id,
                    izin.requested_return_date,
                    izin.leave_date,
                )
                .await?,
            )
        } else {
            None
        };
        txn.commit().await?;

        let application = self.get_izin(id).await?;
        tracing::info!(izin_id = id, %from, %to, approver_id = actor.id, "Izin decided");
        events::izin_updated(self.state.feed(), &application).await;
        if let Some(santri) = projection {
            events::santri_leave_status_updated(
                self.state.feed(),
                &santri.kode_asrama,
                &santri.leave_status(),
            )
            .await;
        }

        Ok(application)
    }

    /// Withdraws a pending application. Only its creator may do so.
    pub async fn delete_izin(&self, id: i64, actor: Actor) -> Result<(), AppError> {
        let txn = self.state.db().begin().await?;

        let izin = izin_sakit_pulang::Model::find_by_id(&txn, id)
            .await?
            .ok_or_else(|| AppError::not_found("IzinSakitPulang", id))?;

        if izin.created_by != actor.id {
            tracing::warn!(
                izin_id = id,
                actor_id = actor.id,
                "Izin delete by non-creator refused"
            );
            return Err(AppError::Permission(
                "Only the creator may delete a leave application".into(),
            ));
        }
        if !Self::can_delete(izin.status) {
            tracing::warn!(
                izin_id = id,
                status = %izin.status,
                "Izin delete after decision refused"
            );
            return Err(AppError::Permission(format!(
                "A leave application that is {} can no longer be deleted",
                izin.status
            )));
        }

        izin_sakit_pulang::Model::delete_by_id(&txn, id).await?;
        txn.commit().await?;

        tracing::info!(izin_id = id, "Izin deleted");
        events::izin_deleted(self.state.feed(), id, izin.santri_id).await;

        Ok(())
    }

    /// Closes an approved leave and puts the santri back to `Ada`.
    pub async fn mark_returned(
        &self,
        id: i64,
        actual_return_date: DateTime<Utc>,
    ) -> Result<LeaveApplication, AppError> {
        let db = self.state.db();
        let izin = izin_sakit_pulang::Model::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::not_found("IzinSakitPulang", id))?;

        if !izin.status.can_transition_to(IzinStatus::Returned) {
            tracing::warn!(
                izin_id = id,
                status = %izin.status,
                "Return on unapproved izin refused"
            );
            return Err(AppError::InvalidState(format!(
                "Only approved leave can be returned, this one is {}",
                izin.status
            )));
        }

        let txn = db.begin().await?;
        let moved = izin_sakit_pulang::Model::transition(
            &txn,
            id,
            IzinStatus::Approved,
            IzinStatus::Returned,
            Some(actual_return_date),
        )
        .await?;
        if !moved {
            return Err(AppError::InvalidState(
                "Leave application was changed by someone else".into(),
            ));
        }
        let santri = santri::Model::record_return(&txn, izin.santri_id, None).await?;
        txn.commit().await?;

        let application = self.get_izin(id).await?;
        tracing::info!(izin_id = id, santri_id = izin.santri_id, "Santri returned");
        events::izin_updated(self.state.feed(), &application).await;
        events::santri_leave_status_updated(
            self.state.feed(),
            &santri.kode_asrama,
            &santri.leave_status(),
        )
        .await;

        Ok(application)
    }

    /// Staff correction: marks the santri as back and records who forced it.
    ///
    /// An approved application still waiting for its return is closed as
    /// `Returned` at the time of the override, so it no longer counts as late.
    ///
    /// # Arguments
    ///
    /// * `santri_id` - The santri to put back to `Ada`.
    /// * `actor` - Must be staff; its id lands in `overriddenBy`.
    pub async fn override_return_status(
        &self,
        santri_id: i64,
        actor: Actor,
    ) -> Result<SantriLeaveStatus, AppError> {
        if !actor.role.is_staff() {
            tracing::warn!(
                santri_id,
                actor_id = actor.id,
                role = %actor.role,
                "Return override refused"
            );
            return Err(AppError::Permission(format!(
                "{} cannot override a santri's return status",
                actor.role
            )));
        }

        let db = self.state.db();
        let current = santri::Model::find_by_id(db, santri_id)
            .await?
            .ok_or_else(|| AppError::not_found("Santri", santri_id))?;
        if current.status_kepulangan().is_none() {
            return Err(AppError::InvalidState(
                "Santri has no recorded kepulangan".into(),
            ));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        let open = izin_sakit_pulang::Model::find_open_for_santri(&txn, santri_id).await?;
        for izin in &open {
            izin_sakit_pulang::Model::transition(
                &txn,
                izin.id,
                IzinStatus::Approved,
                IzinStatus::Returned,
                Some(now),
            )
            .await?;
        }
        let updated = santri::Model::record_return(&txn, santri_id, Some(actor.id)).await?;
        txn.commit().await?;
        let status = updated.leave_status();

        tracing::info!(
            santri_id,
            overridden_by = actor.id,
            closed = open.len(),
            "Return status overridden"
        );
        for izin in &open {
            let application = self.get_izin(izin.id).await?;
            events::izin_updated(self.state.feed(), &application).await;
        }
        events::santri_leave_status_updated(self.state.feed(), &updated.kode_asrama, &status)
            .await;

        Ok(status)
    }
}
