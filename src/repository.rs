//! Generic repository: uniform CRUD and filtered reads over any [`Table`].
//!
//! Every operation builds a [`Statement`] and runs it through
//! [`Executor::execute`] under a fixed label, so a store failure always
//! surfaces as a [`QueryExecutionError`] naming the operation.

use crate::error::{QueryExecutionError, StoreError};
use crate::sql::{Condition, OrderBy, Row, Statement};
use crate::store::{Client, Executor};
use crate::table::{Id, Table};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// Compiled find options: store-ready condition, ordering and paging.
#[derive(Clone, Debug, Default)]
pub struct FindOptionsSql {
    pub condition: Option<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub struct Repository<T, C> {
    executor: Executor<C>,
    _table: PhantomData<fn() -> T>,
}

impl<T, C: Clone> Clone for Repository<T, C> {
    fn clone(&self) -> Self {
        Repository {
            executor: self.executor.clone(),
            _table: PhantomData,
        }
    }
}

fn to_row<S: Serialize>(table: &str, value: &S) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Unsupported(format!(
            "{} payload must be an object, got {}",
            table, other
        ))),
    }
}

fn decode<S: DeserializeOwned>(row: Row) -> Result<S, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn decode_all<S: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<S>, StoreError> {
    rows.into_iter().map(decode).collect()
}

fn first<S: DeserializeOwned>(rows: Vec<Row>) -> Result<Option<S>, StoreError> {
    rows.into_iter().next().map(decode).transpose()
}

fn count_of(rows: &[Row]) -> Result<u64, StoreError> {
    let cell = rows.first().and_then(|r| r.get("count"));
    match cell {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| StoreError::Other("count query returned no count".into()))
}

impl<T: Table, C: Client> Repository<T, C> {
    pub fn new(client: C) -> Self {
        Repository {
            executor: Executor::new(client),
            _table: PhantomData,
        }
    }

    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    fn by_id(id: &Id) -> Condition {
        Condition::eq(T::PRIMARY_KEY, id.to_value())
    }

    /// Filter, then order, then offset, then limit.
    pub async fn find_all(&self, options: FindOptionsSql) -> Result<Vec<T::Select>, QueryExecutionError> {
        let statement = Statement::Select {
            table: T::table_ref(),
            condition: options.condition,
            order_by: options.order_by,
            limit: options.limit,
            offset: options.offset,
        };
        self.executor
            .execute("FindAll", move |client| async move {
                decode_all(client.query(&statement).await?)
            })
            .await
    }

    /// Page of rows plus the total matching the same condition.
    pub async fn find_and_count(
        &self,
        options: FindOptionsSql,
    ) -> Result<(Vec<T::Select>, u64), QueryExecutionError> {
        let condition = options.condition.clone();
        tokio::try_join!(self.find_all(options), self.count(condition))
    }

    pub async fn find_by_id(&self, id: &Id) -> Result<Option<T::Select>, QueryExecutionError> {
        let statement = Statement::Select {
            table: T::table_ref(),
            condition: Some(Self::by_id(id)),
            order_by: Vec::new(),
            limit: Some(1),
            offset: None,
        };
        self.executor
            .execute("FindById", move |client| async move {
                first(client.query(&statement).await?)
            })
            .await
    }

    /// First match in store order. Pass ordering through `find_all` when it matters.
    pub async fn find_one(&self, condition: Condition) -> Result<Option<T::Select>, QueryExecutionError> {
        let statement = Statement::Select {
            table: T::table_ref(),
            condition: Some(condition),
            order_by: Vec::new(),
            limit: Some(1),
            offset: None,
        };
        self.executor
            .execute("FindOne", move |client| async move {
                first(client.query(&statement).await?)
            })
            .await
    }

    pub async fn count(&self, condition: Option<Condition>) -> Result<u64, QueryExecutionError> {
        let statement = Statement::Count {
            table: T::table_ref(),
            condition,
        };
        self.executor
            .execute("Count", move |client| async move {
                count_of(&client.query(&statement).await?)
            })
            .await
    }

    pub async fn check_exists(&self, condition: Condition) -> Result<bool, QueryExecutionError> {
        Ok(self.count(Some(condition)).await? > 0)
    }

    pub async fn check_exists_by_id(&self, id: &Id) -> Result<bool, QueryExecutionError> {
        self.check_exists(Self::by_id(id)).await
    }

    /// Insert one row; the returned record includes store-assigned defaults.
    pub async fn create(&self, record: &T::Insert) -> Result<T::Select, QueryExecutionError> {
        let row = to_row(T::NAME, record);
        self.executor
            .execute("Create", move |client| async move {
                let statement = Statement::Insert {
                    table: T::table_ref(),
                    rows: vec![row?],
                };
                first(client.query(&statement).await?)?
                    .ok_or_else(|| StoreError::Other("insert returned no row".into()))
            })
            .await
    }

    pub async fn create_many(&self, records: &[T::Insert]) -> Result<Vec<T::Select>, QueryExecutionError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Result<Vec<Row>, StoreError> = records.iter().map(|r| to_row(T::NAME, r)).collect();
        self.executor
            .execute("CreateMany", move |client| async move {
                let statement = Statement::Insert {
                    table: T::table_ref(),
                    rows: rows?,
                };
                decode_all(client.query(&statement).await?)
            })
            .await
    }

    /// `None` when no row has `id`.
    pub async fn update(&self, id: &Id, partial: &T::Update) -> Result<Option<T::Select>, QueryExecutionError> {
        let values = to_row(T::NAME, partial);
        let condition = Self::by_id(id);
        self.executor
            .execute("Update", move |client| async move {
                let statement = Statement::Update {
                    table: T::table_ref(),
                    condition,
                    values: values?,
                };
                first(client.query(&statement).await?)
            })
            .await
    }

    /// One update per item, issued in order. Ids with no row are skipped.
    pub async fn update_many(&self, items: &[(Id, T::Update)]) -> Result<Vec<T::Select>, QueryExecutionError> {
        let statements: Result<Vec<Statement>, StoreError> = items
            .iter()
            .map(|(id, partial)| {
                Ok(Statement::Update {
                    table: T::table_ref(),
                    condition: Self::by_id(id),
                    values: to_row(T::NAME, partial)?,
                })
            })
            .collect();
        self.executor
            .execute("UpdateMany", move |client| async move {
                let mut out = Vec::new();
                for statement in statements? {
                    if let Some(row) = first(client.query(&statement).await?)? {
                        out.push(row);
                    }
                }
                Ok(out)
            })
            .await
    }

    /// Idempotent: deleting a missing id is not an error.
    pub async fn delete(&self, id: &Id) -> Result<(), QueryExecutionError> {
        let statement = Statement::Delete {
            table: T::table_ref(),
            condition: Self::by_id(id),
        };
        self.executor
            .execute("Delete", move |client| async move {
                client.query(&statement).await.map(|_| ())
            })
            .await
    }

    pub async fn delete_many(&self, ids: &[Id]) -> Result<(), QueryExecutionError> {
        if ids.is_empty() {
            return Ok(());
        }
        let statement = Statement::Delete {
            table: T::table_ref(),
            condition: Condition::in_list(T::PRIMARY_KEY, ids.iter().map(Id::to_value).collect()),
        };
        self.executor
            .execute("DeleteMany", move |client| async move {
                client.query(&statement).await.map(|_| ())
            })
            .await
    }
}
