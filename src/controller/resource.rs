//! Generic CRUD controller for one resource table.

use super::{bind, BoxHandler, Controller};
use crate::error::AppError;
use crate::filter::{FilterNode, FilterRule, FilterRuleGroup, Operator};
use crate::metadata::{ControllerDecl, MetadataStore};
use crate::response::{success_many, success_one};
use crate::service::{CrudService, FindOptions};
use crate::store::Client;
use crate::table::{Id, Table};
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ResourceController<T, C> {
    service: CrudService<T, C>,
    search_fields: Vec<&'static str>,
}

impl<T: Table, C: Client> ResourceController<T, C> {
    pub fn new(service: CrudService<T, C>) -> Self {
        ResourceController {
            service,
            search_fields: Vec::new(),
        }
    }

    /// Enable the `search` handler over these text columns.
    pub fn with_search_fields(mut self, fields: &[&'static str]) -> Self {
        self.search_fields = fields.to_vec();
        self
    }

    pub fn service(&self) -> &CrudService<T, C> {
        &self.service
    }

    /// Declare the standard CRUD routes at `base_path`. Chain `.get("/search", "search")`
    /// when search fields are configured.
    pub fn declare<'a>(store: &'a mut MetadataStore, base_path: &str) -> ControllerDecl<'a> {
        store
            .controller::<Self>()
            .base_path(base_path)
            .get("/", "find_all")
            .get("/:id", "find_by_id")
            .post("/", "create")
            .put("/:id", "update")
            .patch("/:id", "update")
            .delete("/:id", "delete")
    }

    async fn find_all(&self, req: Request) -> Result<Response, AppError> {
        let options = FindOptions::from_query(&query_params(&req)?)?;
        let (rows, total) = self.service.find_and_count(&options).await?;
        Ok(success_many(rows, Some(total)).into_response())
    }

    async fn find_by_id(&self, req: Request) -> Result<Response, AppError> {
        let (mut parts, _) = req.into_parts();
        let id = path_id::<T>(&mut parts).await?;
        let row = self.service.find_by_id(&id).await?;
        Ok(success_one(row).into_response())
    }

    /// OR of `contains` over the search fields, plus primary key equality
    /// when the term parses as a key.
    async fn search(&self, req: Request) -> Result<Response, AppError> {
        let params = query_params(&req)?;
        let term = params.get("query").cloned().unwrap_or_default();
        let mut rules: Vec<FilterNode> = self
            .search_fields
            .iter()
            .map(|f| FilterRule::new(*f, Operator::Contains, Value::String(term.clone())).into())
            .collect();
        if let Ok(id) = Id::parse_for(T::column(T::PRIMARY_KEY), &term) {
            rules.push(FilterRule::new(T::PRIMARY_KEY, Operator::Equals, id.to_value()).into());
        }
        let options = FindOptions::from_query(&params)?.with_filter(FilterRuleGroup::or(rules));
        let rows = self.service.find_all(&options).await?;
        Ok(success_many(rows, None).into_response())
    }

    async fn create(&self, req: Request) -> Result<Response, AppError> {
        let data: T::Insert = json_body(req).await?;
        let row = self.service.create(&data).await?;
        Ok(success_one(row).into_response())
    }

    async fn update(&self, req: Request) -> Result<Response, AppError> {
        let (mut parts, body) = req.into_parts();
        let id = path_id::<T>(&mut parts).await?;
        let partial: T::Update = json_body(Request::from_parts(parts, body)).await?;
        let row = self.service.update(&id, &partial).await?;
        Ok(success_one(row).into_response())
    }

    async fn delete(&self, req: Request) -> Result<Response, AppError> {
        let (mut parts, _) = req.into_parts();
        let id = path_id::<T>(&mut parts).await?;
        self.service.delete(&id).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

/// The `:id` path segment, parsed by the primary key column type.
async fn path_id<T: Table>(parts: &mut Parts) -> Result<Id, AppError> {
    let Path(raw) = Path::<String>::from_request_parts(parts, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Id::parse_for(T::column(T::PRIMARY_KEY), &raw)
}

fn query_params(req: &Request) -> Result<HashMap<String, String>, AppError> {
    Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn json_body<B: DeserializeOwned>(req: Request) -> Result<B, AppError> {
    let Json(body) = Json::<B>::from_request(req, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(body)
}

fn respond(result: Result<Response, AppError>) -> Response {
    result.unwrap_or_else(IntoResponse::into_response)
}

impl<T: Table, C: Client> Controller for ResourceController<T, C> {
    fn handler(self: Arc<Self>, name: &str) -> Option<BoxHandler> {
        let h = match name {
            "find_all" => bind(&self, |c, req| async move { respond(c.find_all(req).await) }),
            "find_by_id" => bind(&self, |c, req| async move { respond(c.find_by_id(req).await) }),
            "search" if !self.search_fields.is_empty() => {
                bind(&self, |c, req| async move { respond(c.search(req).await) })
            }
            "create" => bind(&self, |c, req| async move { respond(c.create(req).await) }),
            "update" => bind(&self, |c, req| async move { respond(c.update(req).await) }),
            "delete" => bind(&self, |c, req| async move { respond(c.delete(req).await) }),
            _ => return None,
        };
        Some(h)
    }
}
