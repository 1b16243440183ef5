//! CrudService: pagination defaults, filter compilation and not-found
//! semantics over a generic repository.

use super::options::{FindOptions, DEFAULT_LIMIT, DEFAULT_OFFSET};
use crate::error::AppError;
use crate::filter::{compile, FilterRuleGroup};
use crate::repository::{FindOptionsSql, Repository};
use crate::sql::OrderBy;
use crate::store::Client;
use crate::table::{Id, Table};
use std::future::Future;

pub struct CrudService<T, C> {
    repository: Repository<T, C>,
}

impl<T, C: Clone> Clone for CrudService<T, C> {
    fn clone(&self) -> Self {
        CrudService {
            repository: self.repository.clone(),
        }
    }
}

impl<T: Table, C: Client> CrudService<T, C> {
    pub fn new(client: C) -> Self {
        CrudService {
            repository: Repository::new(client),
        }
    }

    pub fn from_repository(repository: Repository<T, C>) -> Self {
        CrudService { repository }
    }

    pub fn repository(&self) -> &Repository<T, C> {
        &self.repository
    }

    /// Run `op`, logging a failure before handing it back unchanged.
    async fn guarded<R>(
        &self,
        operation: &'static str,
        op: impl Future<Output = Result<R, AppError>>,
    ) -> Result<R, AppError> {
        op.await.map_err(|e| {
            if e.status().is_server_error() {
                tracing::error!(table = T::NAME, operation, error = %e, "service operation failed");
            } else {
                tracing::warn!(table = T::NAME, operation, error = %e, "service operation rejected");
            }
            e
        })
    }

    /// Compile client options: filter tree to condition, default paging,
    /// order-by fields mapped to table columns. Unknown order-by fields are dropped.
    pub fn compile_options(&self, options: &FindOptions) -> Result<FindOptionsSql, AppError> {
        let condition = options.filter.as_ref().map(compile).transpose()?;
        let mut order_by = Vec::with_capacity(options.order_by.len());
        for o in &options.order_by {
            match T::column(&o.field) {
                Some(column) => order_by.push(OrderBy {
                    column: column.name,
                    direction: o.direction,
                }),
                None => tracing::debug!(table = T::NAME, field = %o.field, "dropping unknown order-by field"),
            }
        }
        Ok(FindOptionsSql {
            condition,
            order_by,
            limit: Some(options.limit.unwrap_or(DEFAULT_LIMIT)),
            offset: Some(options.offset.unwrap_or(DEFAULT_OFFSET)),
        })
    }

    pub async fn find_all(&self, options: &FindOptions) -> Result<Vec<T::Select>, AppError> {
        self.guarded("find_all", async {
            let sql = self.compile_options(options)?;
            Ok(self.repository.find_all(sql).await?)
        })
        .await
    }

    /// Page of records and the total count for the same filter.
    pub async fn find_and_count(&self, options: &FindOptions) -> Result<(Vec<T::Select>, u64), AppError> {
        self.guarded("find_and_count", async {
            let sql = self.compile_options(options)?;
            Ok(self.repository.find_and_count(sql).await?)
        })
        .await
    }

    pub async fn find_by_id(&self, id: &Id) -> Result<T::Select, AppError> {
        self.guarded("find_by_id", async {
            self.repository
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} {}", T::NAME, id)))
        })
        .await
    }

    /// First match or `None`; absence is not an error here.
    pub async fn find_one(&self, filter: &FilterRuleGroup) -> Result<Option<T::Select>, AppError> {
        self.guarded("find_one", async {
            let condition = compile(filter)?;
            Ok(self.repository.find_one(condition).await?)
        })
        .await
    }

    pub async fn count(&self, filter: Option<&FilterRuleGroup>) -> Result<u64, AppError> {
        self.guarded("count", async {
            let condition = filter.map(compile).transpose()?;
            Ok(self.repository.count(condition).await?)
        })
        .await
    }

    pub async fn check_exists(&self, filter: &FilterRuleGroup) -> Result<bool, AppError> {
        self.guarded("check_exists", async {
            let condition = compile(filter)?;
            Ok(self.repository.check_exists(condition).await?)
        })
        .await
    }

    /// No uniqueness pre-check; constraint violations come back as query errors.
    pub async fn create(&self, data: &T::Insert) -> Result<T::Select, AppError> {
        self.guarded("create", async { Ok(self.repository.create(data).await?) })
            .await
    }

    pub async fn create_many(&self, data: &[T::Insert]) -> Result<Vec<T::Select>, AppError> {
        self.guarded("create_many", async { Ok(self.repository.create_many(data).await?) })
            .await
    }

    /// Existence check first; a missing id never reaches the update statement.
    pub async fn update(&self, id: &Id, partial: &T::Update) -> Result<T::Select, AppError> {
        self.guarded("update", async {
            self.ensure_exists(id).await?;
            self.repository
                .update(id, partial)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} {}", T::NAME, id)))
        })
        .await
    }

    /// Existence check first; a missing id never reaches the delete statement.
    pub async fn delete(&self, id: &Id) -> Result<(), AppError> {
        self.guarded("delete", async {
            self.ensure_exists(id).await?;
            Ok(self.repository.delete(id).await?)
        })
        .await
    }

    async fn ensure_exists(&self, id: &Id) -> Result<(), AppError> {
        if self.repository.check_exists_by_id(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("{} {}", T::NAME, id)))
        }
    }
}
