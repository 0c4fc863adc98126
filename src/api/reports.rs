use chrono::Utc;
use log::info;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Admin,
            report::{CreateReportRequest, ReportView},
        },
        identity::AuthenticatedIdentity,
        mongodb::Id,
        report::{Report, ReportStats, ReportUpdate},
        store::Storage,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        create_report,
        reports,
        report_stats,
        report,
        update_report,
        delete_report
    ]
}

async fn load(storage: &Storage, report_id: Id) -> Result<Report> {
    storage
        .reports
        .report(report_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Report with ID '{report_id}'")))
}

#[post("/reports", data = "<request>", format = "json")]
pub async fn create_report(
    identity: AuthenticatedIdentity,
    request: Json<CreateReportRequest>,
    storage: &State<Storage>,
) -> Result<(Status, Json<ReportView>)> {
    let report = request.into_inner().into_report(identity.id())?;
    let report = storage.reports.insert_report(report).await?;
    info!("Identity {} filed report {}", identity.id(), report.id);
    Ok((Status::Created, Json(report.into())))
}

/// Admins see every report; constituents see their own.
#[get("/reports")]
pub async fn reports(
    identity: AuthenticatedIdentity,
    storage: &State<Storage>,
) -> Result<Json<Vec<ReportView>>> {
    let filed_by = (!identity.is_admin()).then(|| identity.id());
    let reports = storage.reports.reports(filed_by).await?;
    Ok(Json(reports.into_iter().map(ReportView::from).collect()))
}

#[get("/reports/stats")]
pub async fn report_stats(_admin: Admin, storage: &State<Storage>) -> Result<Json<ReportStats>> {
    let reports = storage.reports.reports(None).await?;
    Ok(Json(ReportStats::tally(reports.iter().map(|r| &r.report))))
}

#[get("/reports/<report_id>")]
pub async fn report(
    identity: AuthenticatedIdentity,
    report_id: Id,
    storage: &State<Storage>,
) -> Result<Json<ReportView>> {
    let report = load(storage, report_id).await?;
    if !identity.is_admin() && report.identity_id != identity.id() {
        return Err(Error::Status(
            Status::Forbidden,
            "Reports are only visible to their filer".to_string(),
        ));
    }
    Ok(Json(report.into()))
}

#[put("/reports/<report_id>", data = "<update>", format = "json")]
pub async fn update_report(
    admin: Admin,
    report_id: Id,
    update: Json<ReportUpdate>,
    storage: &State<Storage>,
) -> Result<Json<ReportView>> {
    let mut report = load(storage, report_id).await?;
    report.apply(update.into_inner(), admin.id(), Utc::now())?;
    if !storage.reports.replace_report(&report).await? {
        return Err(Error::not_found(format!("Report with ID '{report_id}'")));
    }
    info!(
        "Admin {} updated report {report_id}, now {}",
        admin.id(),
        report.status
    );
    Ok(Json(report.into()))
}

#[delete("/reports/<report_id>")]
pub async fn delete_report(admin: Admin, report_id: Id, storage: &State<Storage>) -> Result<Status> {
    if !storage.reports.delete_report(report_id).await? {
        return Err(Error::not_found(format!("Report with ID '{report_id}'")));
    }
    info!("Admin {} deleted report {report_id}", admin.id());
    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::error::ErrorBody;
    use crate::model::{
        identity::IdentityCore,
        report::{ReportCore, ReportPriority, ReportStatus},
    };

    use super::*;

    async fn file(client: &Client) -> ReportView {
        let response = client
            .post(uri!(create_report))
            .header(ContentType::JSON)
            .body(json!(CreateReportRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn list(client: &Client) -> Vec<ReportView> {
        let response = client.get(uri!(reports)).dispatch().await;
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    /// A report filed directly into storage by someone else.
    async fn foreign_report(storage: &Storage) -> Report {
        let mut neighbour = IdentityCore::example();
        neighbour.username = "tetangga".to_string();
        neighbour.email = "tetangga@example.com".to_string();
        let neighbour = storage.identities.insert_identity(neighbour).await.unwrap();
        storage
            .reports
            .insert_report(ReportCore::example(neighbour.id))
            .await
            .unwrap()
    }

    async fn update(client: &Client, report_id: Id, body: serde_json::Value) -> (Status, String) {
        let response = client
            .put(uri!(update_report(report_id)))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        (response.status(), response.into_string().await.unwrap_or_default())
    }

    #[backend_test(konstituen)]
    async fn constituents_see_own_reports(client: Client, storage: Storage) {
        let own = file(&client).await;
        assert_eq!(own.status, ReportStatus::Pending);
        assert_eq!(own.priority, ReportPriority::Medium);
        let foreign = foreign_report(&storage).await;

        assert_eq!(list(&client).await, vec![own.clone()]);
        let own_id: Id = own.id.parse().unwrap();
        let response = client.get(uri!(report(own_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(uri!(report(foreign.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test(konstituen)]
    async fn constituents_cannot_triage(client: Client) {
        let report_id: Id = file(&client).await.id.parse().unwrap();
        let (status, _) = update(&client, report_id, json!({ "status": "resolved" })).await;
        assert_eq!(Status::Forbidden, status);
        let response = client.delete(uri!(delete_report(report_id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client.get(uri!(report_stats)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }

    #[backend_test]
    async fn reports_need_login(client: Client) {
        let response = client
            .post(uri!(create_report))
            .header(ContentType::JSON)
            .body(json!(CreateReportRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(admin)]
    async fn admin_works_through_report(client: Client, storage: Storage) {
        let report = foreign_report(&storage).await;
        assert_eq!(list(&client).await.len(), 1);

        let (status, body) = update(
            &client,
            report.id,
            json!({ "status": "in_progress", "priority": "urgent" }),
        )
        .await;
        assert_eq!(Status::Ok, status);
        let view: ReportView = serde_json::from_str(&body).unwrap();
        assert_eq!(view.status, ReportStatus::InProgress);
        assert_eq!(view.priority, ReportPriority::Urgent);
        assert_eq!(view.resolved_by, None);

        let (status, body) = update(
            &client,
            report.id,
            json!({ "status": "resolved", "admin_notes": "Sudah ditambal" }),
        )
        .await;
        assert_eq!(Status::Ok, status);
        let view: ReportView = serde_json::from_str(&body).unwrap();
        assert_eq!(view.status, ReportStatus::Resolved);
        assert!(view.resolved_by.is_some());
        assert!(view.resolved_at.is_some());
        assert_eq!(view.admin_notes.as_deref(), Some("Sudah ditambal"));

        // Resolved is final.
        let (status, body) = update(&client, report.id, json!({ "status": "pending" })).await;
        assert_eq!(Status::Conflict, status);
        let error: ErrorBody = serde_json::from_str(&body).unwrap();
        assert_eq!(error.error, "InvalidTransition");
        let stored = storage.reports.report(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Resolved);

        let response = client.delete(uri!(delete_report(report.id))).dispatch().await;
        assert_eq!(Status::NoContent, response.status());
        assert!(list(&client).await.is_empty());
    }

    #[backend_test(admin)]
    async fn stats_for_admins(client: Client, storage: Storage) {
        let first = foreign_report(&storage).await;
        let mut second = ReportCore::example(first.identity_id);
        second.category = "pelayanan".to_string();
        storage.reports.insert_report(second).await.unwrap();
        update(&client, first.id, json!({ "status": "rejected" })).await;

        let response = client.get(uri!(report_stats)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let stats: ReportStats =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.by_category["pelayanan"], 1);
        assert_eq!(stats.by_priority[&ReportPriority::High], 2);
    }
}
