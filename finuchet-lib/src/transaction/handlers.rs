use crate::category::owned_category;
use crate::error::{ensure_owner, HandlerError};
use crate::params::{parse_date, parse_kind, DateRangeQuery};
use crate::summary::Summary;
use crate::user::UserId;
use actix_web::{web, HttpResponse, Responder};
use finuchet_repo::category_repo::CategoryRepo;
use finuchet_repo::transaction_repo::{Filter, NewTransaction, Transaction, TransactionRepo};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub from: Option<String>,
    pub until: Option<String>,
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub category_id: Option<String>,
}

async fn owned_transaction(
    transaction_repo: &Arc<dyn TransactionRepo>,
    transaction_id: &str,
    user_id: &str,
) -> Result<Transaction, HandlerError> {
    let transaction = transaction_repo.get_transaction(transaction_id).await?;
    ensure_owner(&transaction.user_id, user_id)?;
    Ok(transaction)
}

#[get("")]
pub async fn get_transactions(
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    user_id: web::ReqData<UserId>,
    query: web::Query<TransactionQuery>,
) -> Result<impl Responder, HandlerError> {
    let query = query.into_inner();
    let (from, until) = DateRangeQuery {
        from: query.from,
        until: query.until,
    }
    .range()?;
    let filter = Filter {
        from,
        until,
        category_id: query.category_id.filter(|c| !c.is_empty()),
        kind: parse_kind(query.kind.as_deref())?,
    };

    let transactions = transaction_repo
        .get_transactions(&user_id.into_inner(), filter)
        .await?;
    Ok(HttpResponse::Ok().json(transactions))
}

/// Imports only happen through a connection sync, so a client can never set the external id
#[post("")]
pub async fn create_transaction(
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    request: web::Json<TransactionRequest>,
) -> Result<impl Responder, HandlerError> {
    let request = request.into_inner();
    let (Some(amount), Some(kind), Some(date)) = (
        request.amount,
        parse_kind(request.kind.as_deref())?,
        parse_date(request.date.as_deref(), "date")?,
    ) else {
        return Err(HandlerError::bad_request("Amount, type and date are required"));
    };
    if amount <= Decimal::ZERO {
        return Err(HandlerError::bad_request("Amount must be positive"));
    }

    let user_id = user_id.into_inner();
    let category_id = request.category_id.filter(|c| !c.is_empty());
    if let Some(category_id) = &category_id {
        let category = owned_category(&category_repo, category_id, &user_id).await?;
        if category.kind != kind {
            return Err(HandlerError::bad_request(format!(
                "Category {} is not an {} category",
                category.name,
                kind.to_string().to_lowercase()
            )));
        }
    }

    let description = request
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());
    let transaction = transaction_repo
        .create_transaction(
            &user_id,
            NewTransaction::new(amount, kind, description, date, category_id),
        )
        .await?;
    info!(transaction_id = %transaction.id, "Created transaction");
    Ok(HttpResponse::Ok().json(transaction))
}

#[get("/{transaction_id}")]
pub async fn get_transaction(
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    user_id: web::ReqData<UserId>,
    transaction_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let transaction = owned_transaction(&transaction_repo, &transaction_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[delete("/{transaction_id}")]
pub async fn delete_transaction(
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    user_id: web::ReqData<UserId>,
    transaction_id: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let transaction = owned_transaction(&transaction_repo, &transaction_id, &user_id).await?;
    let transaction = transaction_repo.delete_transaction(&transaction.id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[get("/summary")]
pub async fn summary_report(
    transaction_repo: web::Data<Arc<dyn TransactionRepo>>,
    category_repo: web::Data<Arc<dyn CategoryRepo>>,
    user_id: web::ReqData<UserId>,
    query: web::Query<DateRangeQuery>,
) -> Result<impl Responder, HandlerError> {
    let (from, until) = query.range()?;
    let user_id = user_id.into_inner();

    let names: HashMap<String, String> = category_repo
        .get_categories(&user_id, None)
        .await?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();
    let transactions = transaction_repo
        .get_transactions(
            &user_id,
            Filter {
                from,
                until,
                ..Filter::NONE
            },
        )
        .await?;

    let mut summary = Summary::default();
    for transaction in &transactions {
        let category = transaction
            .category_id
            .as_ref()
            .and_then(|id| names.get(id))
            .map(String::as_str);
        summary.add(transaction.date, transaction.kind, category, transaction.amount);
    }
    Ok(HttpResponse::Ok().json(summary))
}
