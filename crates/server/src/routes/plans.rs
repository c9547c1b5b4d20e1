//! Travel plans saved from the chat planner.
use chrono::Utc;
use explore_domain::page::PLAN_PAGE_SIZE;
use explore_domain::{NewPlan, Page, TravelPlan, paginate};
use explore_upstream::Value;
use salvo::http::StatusCode;
use salvo::prelude::*;
use serde::Serialize;

use super::{page_param, read_json};
use crate::error::{AppError, AppResult};
use crate::records::{TRAVEL_PLANS, plan_fields, plan_from_document};
use crate::session::SessionDepotExt;
use crate::state::StateDepotExt;

/// A plan as the browser renders it, with its reply split into paragraphs.
#[derive(Debug, Serialize)]
pub(crate) struct PlanView {
    #[serde(flatten)]
    plan: TravelPlan,
    paragraphs: Vec<String>,
}

impl From<TravelPlan> for PlanView {
    fn from(plan: TravelPlan) -> Self {
        let paragraphs = plan.paragraphs().into_iter().map(str::to_owned).collect();
        Self { plan, paragraphs }
    }
}

#[handler]
pub(crate) async fn list_plans(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Page<PlanView>>> {
    let page = page_param(req);
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    let mut plans: Vec<TravelPlan> = documents
        .find_eq(TRAVEL_PLANS, "userId", Value::from(session.uid.as_str()))
        .await?
        .iter()
        .map(plan_from_document)
        .collect();
    plans.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(paginate(plans, page, PLAN_PAGE_SIZE).map(PlanView::from)))
}

#[handler]
pub(crate) async fn create_plan(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let draft: NewPlan = read_json(req).await?;
    draft.validate()?;
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    let mut plan = draft.into_plan(session.uid.clone(), Utc::now());
    let doc = documents.create(TRAVEL_PLANS, None, plan_fields(&plan)).await?;
    plan.id = doc.id;
    tracing::info!(id = %plan.id, title = %plan.title, "travel plan saved");
    res.status_code(StatusCode::CREATED);
    res.render(Json(PlanView::from(plan)));
    Ok(())
}

#[handler]
pub(crate) async fn delete_plan(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let id = req.param::<String>("id").unwrap_or_default();
    let session = depot.session()?;
    let documents = depot.db_state()?.documents_for(session);
    let doc = documents
        .get(TRAVEL_PLANS, &id)
        .await?
        .ok_or(AppError::NotFound("Travel plan"))?;
    if plan_from_document(&doc).user_id != session.uid {
        return Err(AppError::Forbidden("plans"));
    }
    documents.delete(TRAVEL_PLANS, &id).await?;
    tracing::info!(%id, "travel plan deleted");
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}
