//! sea-orm implementation of the data-access contract.
//!
//! Statements are built with sea_query and executed through raw
//! [`Statement`]s so the same code serves SQLite, Postgres, and MySQL.
//! Uniqueness is enforced by the schema's unique indexes; violations surface
//! as AlreadyExists.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use log::{info, warn};
use sea_orm::sea_query::{
    DynIden, Expr, InsertStatement, IntoIden, MysqlQueryBuilder, Order, PostgresQueryBuilder,
    Query, QueryStatementWriter, SelectStatement, SqliteQueryBuilder,
};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr, ExecResult,
    QueryResult, Statement,
};
use sea_orm_migration::MigratorTrait;

use lineal_store::schema::validate_property_map;
use lineal_store::time::now_millis;
use lineal_store::{
    Artifact, Association, Attribution, Context, Event, Execution, LineageGraph, ListedPage,
    ListOperationOptions, MetadataAccessObject, OrderByField, ParentContext, StoreError,
    StoreResult, TypeDef, TypeKind,
};

use crate::db::*;
use crate::migration::Migrator;
use crate::rows::*;

/// Maps backend failures onto the store's error surface. Unique-key
/// violations become AlreadyExists; everything else is an internal fault.
pub(crate) fn map_db_err(err: DbErr) -> StoreError {
    let message = err.to_string();
    if is_unique_violation(&message) {
        StoreError::already_exists(message)
    } else {
        StoreError::internal(message)
    }
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("UNIQUE constraint failed")
        || message.contains("duplicate key value violates unique constraint")
        || message.contains("Duplicate entry")
}

/// Transient faults worth retrying at the executor level.
pub(crate) fn is_transient(err: &StoreError) -> bool {
    if !err.is_internal() {
        return false;
    }
    let message = err.to_string();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("deadlock")
        || message.contains("could not serialize access")
}

#[derive(Clone, Copy)]
enum MaoConnection<'c> {
    Connection(&'c DatabaseConnection),
    Transaction(&'c DatabaseTransaction),
}

macro_rules! with_conn {
    ($self:ident, $conn:ident => $body:expr) => {
        match $self.conn {
            MaoConnection::Connection($conn) => $body,
            MaoConnection::Transaction($conn) => $body,
        }
    };
}

/// Data-access object bound to one connection or transaction scope.
pub struct SqlMetadataAccessObject<'c> {
    conn: MaoConnection<'c>,
    backend: DatabaseBackend,
}

impl<'c> SqlMetadataAccessObject<'c> {
    pub fn for_connection(conn: &'c DatabaseConnection) -> Self {
        SqlMetadataAccessObject {
            backend: conn.get_database_backend(),
            conn: MaoConnection::Connection(conn),
        }
    }

    pub fn for_transaction(txn: &'c DatabaseTransaction) -> Self {
        SqlMetadataAccessObject {
            backend: txn.get_database_backend(),
            conn: MaoConnection::Transaction(txn),
        }
    }

    fn build<S: QueryStatementWriter>(&self, stmt: &S) -> Statement {
        let (sql, values) = match self.backend {
            DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
            DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
            DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
            _ => stmt.build(SqliteQueryBuilder),
        };
        Statement::from_sql_and_values(self.backend, sql, values)
    }

    async fn exec<S: QueryStatementWriter>(&self, stmt: &S) -> StoreResult<ExecResult> {
        let statement = self.build(stmt);
        with_conn!(self, conn => conn.execute(statement).await).map_err(map_db_err)
    }

    async fn query_all<S: QueryStatementWriter>(&self, stmt: &S) -> StoreResult<Vec<QueryResult>> {
        let statement = self.build(stmt);
        with_conn!(self, conn => conn.query_all(statement).await).map_err(map_db_err)
    }

    async fn query_one<S: QueryStatementWriter>(
        &self,
        stmt: &S,
    ) -> StoreResult<Option<QueryResult>> {
        let statement = self.build(stmt);
        with_conn!(self, conn => conn.query_one(statement).await).map_err(map_db_err)
    }

    async fn insert_returning_id(
        &self,
        mut stmt: InsertStatement,
        id_col: impl IntoIden + Copy + 'static,
    ) -> StoreResult<i64> {
        if self.backend == DatabaseBackend::MySql {
            let result = self.exec(&stmt).await?;
            return Ok(result.last_insert_id() as i64);
        }
        stmt.returning_col(id_col);
        let row = self
            .query_one(&stmt)
            .await?
            .ok_or_else(|| StoreError::internal("insert returned no row"))?;
        row.try_get::<i64>("", &id_col.into_iden().to_string())
            .map_err(|err| StoreError::internal(err.to_string()))
    }

    /// Resolves the declared type of an entity. A missing or dangling
    /// type_id is a bad reference in the request.
    async fn entity_type(&self, kind: TypeKind, type_id: Option<i64>) -> StoreResult<TypeDef> {
        let type_id = type_id.ok_or_else(|| {
            StoreError::invalid_argument(format!("{} has no type_id", kind.label()))
        })?;
        let select = Query::select()
            .from(LinealTypes::Table)
            .columns([
                LinealTypes::Id,
                LinealTypes::Name,
                LinealTypes::Version,
                LinealTypes::Description,
                LinealTypes::PropertiesJson,
            ])
            .and_where(Expr::col(LinealTypes::Id).eq(type_id))
            .and_where(Expr::col(LinealTypes::TypeKind).eq(kind.as_i16()))
            .to_owned();
        match self.query_one(&select).await? {
            Some(row) => type_from_row(&row),
            None => Err(StoreError::invalid_argument(format!(
                "{} type with id {type_id} does not exist",
                kind.label()
            ))),
        }
    }

    async fn row_exists(&self, select: SelectStatement) -> StoreResult<bool> {
        Ok(self.query_one(&select).await?.is_some())
    }

    async fn artifact_exists(&self, artifact_id: i64) -> StoreResult<bool> {
        self.row_exists(
            Query::select()
                .from(LinealArtifacts::Table)
                .column(LinealArtifacts::Id)
                .and_where(Expr::col(LinealArtifacts::Id).eq(artifact_id))
                .to_owned(),
        )
        .await
    }

    async fn execution_exists(&self, execution_id: i64) -> StoreResult<bool> {
        self.row_exists(
            Query::select()
                .from(LinealExecutions::Table)
                .column(LinealExecutions::Id)
                .and_where(Expr::col(LinealExecutions::Id).eq(execution_id))
                .to_owned(),
        )
        .await
    }

    async fn context_exists(&self, context_id: i64) -> StoreResult<bool> {
        self.row_exists(
            Query::select()
                .from(LinealContexts::Table)
                .column(LinealContexts::Id)
                .and_where(Expr::col(LinealContexts::Id).eq(context_id))
                .to_owned(),
        )
        .await
    }

    /// Applies ordering, keyset predicate, and an over-fetch-by-one limit to
    /// `select`, then converts the rows and decides the next page token.
    async fn list_rows<T: PagedEntity>(
        &self,
        mut select: SelectStatement,
        options: Option<&ListOperationOptions>,
        columns: ListingColumns,
        convert: fn(&QueryResult) -> StoreResult<T>,
    ) -> StoreResult<ListedPage<T>> {
        let default_options = ListOperationOptions::default();
        let options = options.unwrap_or(&default_options);
        let (field, is_asc) = options
            .order_by
            .map(|order_by| (order_by.field, order_by.is_asc))
            .unwrap_or((OrderByField::Id, true));
        let order_col = columns.for_field(field);
        let direction = if is_asc { Order::Asc } else { Order::Desc };
        if let Some(token) = options.next_page_token.as_deref() {
            let (last_key, last_id) = parse_page_token(token)?;
            let predicate = if is_asc {
                Expr::col(order_col.clone()).gt(last_key).or(Expr::col(order_col.clone())
                    .eq(last_key)
                    .and(Expr::col(columns.id.clone()).gt(last_id)))
            } else {
                Expr::col(order_col.clone()).lt(last_key).or(Expr::col(order_col.clone())
                    .eq(last_key)
                    .and(Expr::col(columns.id.clone()).lt(last_id)))
            };
            select.and_where(predicate);
        }
        select
            .order_by(order_col.clone(), direction.clone())
            .order_by(columns.id.clone(), direction);
        let page_size = options
            .max_result_size
            .filter(|&size| size > 0)
            .map(|size| size as usize);
        if let Some(page_size) = page_size {
            select.limit(page_size as u64 + 1);
        }
        let rows = self.query_all(&select).await?;
        let mut items = rows
            .iter()
            .map(convert)
            .collect::<StoreResult<Vec<T>>>()?;
        let mut next_page_token = None;
        if let Some(page_size) = page_size {
            if items.len() > page_size {
                items.truncate(page_size);
                let last = &items[page_size - 1];
                next_page_token = Some(format!("{}:{}", last.order_key(field), last.entity_id()));
            }
        }
        Ok(ListedPage {
            items,
            next_page_token,
        })
    }
}

struct ListingColumns {
    id: DynIden,
    create_time: DynIden,
    update_time: DynIden,
}

impl ListingColumns {
    fn for_field(&self, field: OrderByField) -> DynIden {
        match field {
            OrderByField::Id => self.id.clone(),
            OrderByField::CreateTime => self.create_time.clone(),
            OrderByField::LastUpdateTime => self.update_time.clone(),
        }
    }
}

fn artifact_columns() -> ListingColumns {
    ListingColumns {
        id: LinealArtifacts::Id.into_iden(),
        create_time: LinealArtifacts::CreateTimeSinceEpoch.into_iden(),
        update_time: LinealArtifacts::LastUpdateTimeSinceEpoch.into_iden(),
    }
}

fn execution_columns() -> ListingColumns {
    ListingColumns {
        id: LinealExecutions::Id.into_iden(),
        create_time: LinealExecutions::CreateTimeSinceEpoch.into_iden(),
        update_time: LinealExecutions::LastUpdateTimeSinceEpoch.into_iden(),
    }
}

fn context_columns() -> ListingColumns {
    ListingColumns {
        id: LinealContexts::Id.into_iden(),
        create_time: LinealContexts::CreateTimeSinceEpoch.into_iden(),
        update_time: LinealContexts::LastUpdateTimeSinceEpoch.into_iden(),
    }
}

fn parse_page_token(token: &str) -> StoreResult<(i64, i64)> {
    let malformed = || StoreError::invalid_argument(format!("malformed page token `{token}`"));
    let (key, id) = token.split_once(':').ok_or_else(malformed)?;
    Ok((
        key.parse().map_err(|_| malformed())?,
        id.parse().map_err(|_| malformed())?,
    ))
}

fn select_artifacts() -> SelectStatement {
    Query::select()
        .from(LinealArtifacts::Table)
        .columns([
            LinealArtifacts::Id,
            LinealArtifacts::TypeId,
            LinealArtifacts::Uri,
            LinealArtifacts::Name,
            LinealArtifacts::State,
            LinealArtifacts::PropertiesJson,
            LinealArtifacts::CustomPropertiesJson,
            LinealArtifacts::CreateTimeSinceEpoch,
            LinealArtifacts::LastUpdateTimeSinceEpoch,
        ])
        .to_owned()
}

fn select_executions() -> SelectStatement {
    Query::select()
        .from(LinealExecutions::Table)
        .columns([
            LinealExecutions::Id,
            LinealExecutions::TypeId,
            LinealExecutions::Name,
            LinealExecutions::LastKnownState,
            LinealExecutions::PropertiesJson,
            LinealExecutions::CustomPropertiesJson,
            LinealExecutions::CreateTimeSinceEpoch,
            LinealExecutions::LastUpdateTimeSinceEpoch,
        ])
        .to_owned()
}

fn select_contexts() -> SelectStatement {
    Query::select()
        .from(LinealContexts::Table)
        .columns([
            LinealContexts::Id,
            LinealContexts::TypeId,
            LinealContexts::Name,
            LinealContexts::PropertiesJson,
            LinealContexts::CustomPropertiesJson,
            LinealContexts::CreateTimeSinceEpoch,
            LinealContexts::LastUpdateTimeSinceEpoch,
        ])
        .to_owned()
}

fn select_events() -> SelectStatement {
    Query::select()
        .from(LinealEvents::Table)
        .columns([
            LinealEvents::Id,
            LinealEvents::ArtifactId,
            LinealEvents::ExecutionId,
            LinealEvents::EventType,
            LinealEvents::PathJson,
            LinealEvents::MillisecondsSinceEpoch,
        ])
        .to_owned()
}

fn select_types() -> SelectStatement {
    Query::select()
        .from(LinealTypes::Table)
        .columns([
            LinealTypes::Id,
            LinealTypes::Name,
            LinealTypes::Version,
            LinealTypes::Description,
            LinealTypes::PropertiesJson,
        ])
        .to_owned()
}

#[async_trait]
impl MetadataAccessObject for SqlMetadataAccessObject<'_> {
    async fn create_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<i64> {
        if type_def.name.is_empty() {
            return Err(StoreError::invalid_argument("type name must be set"));
        }
        let insert = Query::insert()
            .into_table(LinealTypes::Table)
            .columns([
                LinealTypes::Name,
                LinealTypes::Version,
                LinealTypes::TypeKind,
                LinealTypes::Description,
                LinealTypes::PropertiesJson,
            ])
            .values_panic([
                type_def.name.clone().into(),
                type_def.version.clone().unwrap_or_default().into(),
                kind.as_i16().into(),
                type_def.description.clone().into(),
                to_json_column(&type_def.properties)?.into(),
            ])
            .to_owned();
        self.insert_returning_id(insert, LinealTypes::Id).await
    }

    async fn update_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<()> {
        let type_id = type_def
            .id
            .ok_or_else(|| StoreError::invalid_argument("type id must be set for update"))?;
        let update = Query::update()
            .table(LinealTypes::Table)
            .values([
                (
                    LinealTypes::PropertiesJson,
                    to_json_column(&type_def.properties)?.into(),
                ),
                (LinealTypes::Description, type_def.description.clone().into()),
            ])
            .and_where(Expr::col(LinealTypes::Id).eq(type_id))
            .and_where(Expr::col(LinealTypes::TypeKind).eq(kind.as_i16()))
            .to_owned();
        let result = self.exec(&update).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "no {} type with id {type_id}",
                kind.label()
            )));
        }
        Ok(())
    }

    async fn find_type_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<TypeDef> {
        let select = select_types()
            .and_where(Expr::col(LinealTypes::Name).eq(name))
            .and_where(Expr::col(LinealTypes::Version).eq(version.unwrap_or_default()))
            .and_where(Expr::col(LinealTypes::TypeKind).eq(kind.as_i16()))
            .to_owned();
        match self.query_one(&select).await? {
            Some(row) => type_from_row(&row),
            None => Err(StoreError::not_found(format!(
                "no {} type named `{name}`",
                kind.label()
            ))),
        }
    }

    async fn find_type_id_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<i64> {
        let type_def = self
            .find_type_by_name_and_version(kind, name, version)
            .await?;
        type_def
            .id
            .ok_or_else(|| StoreError::internal("stored type has no id"))
    }

    async fn find_types_by_ids(
        &self,
        kind: TypeKind,
        type_ids: &[i64],
    ) -> StoreResult<Vec<TypeDef>> {
        if type_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_types()
            .and_where(Expr::col(LinealTypes::Id).is_in(type_ids.iter().copied()))
            .and_where(Expr::col(LinealTypes::TypeKind).eq(kind.as_i16()))
            .to_owned();
        let mut by_id = HashMap::new();
        for row in self.query_all(&select).await? {
            let type_def = type_from_row(&row)?;
            if let Some(id) = type_def.id {
                by_id.insert(id, type_def);
            }
        }
        // Missing ids are skipped; input order is preserved.
        Ok(type_ids
            .iter()
            .filter_map(|type_id| by_id.remove(type_id))
            .collect())
    }

    async fn find_types(&self, kind: TypeKind) -> StoreResult<Vec<TypeDef>> {
        let select = select_types()
            .and_where(Expr::col(LinealTypes::TypeKind).eq(kind.as_i16()))
            .order_by(LinealTypes::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(type_from_row)
            .collect()
    }

    async fn create_parent_type_link(
        &self,
        _kind: TypeKind,
        child: &TypeDef,
        parent: &TypeDef,
    ) -> StoreResult<()> {
        let child_id = child
            .id
            .ok_or_else(|| StoreError::invalid_argument("child type id must be set"))?;
        let parent_id = parent
            .id
            .ok_or_else(|| StoreError::invalid_argument("parent type id must be set"))?;
        let insert = Query::insert()
            .into_table(LinealParentTypes::Table)
            .columns([LinealParentTypes::TypeId, LinealParentTypes::ParentTypeId])
            .values_panic([child_id.into(), parent_id.into()])
            .to_owned();
        self.exec(&insert).await?;
        Ok(())
    }

    async fn find_parent_types_by_type_ids(
        &self,
        kind: TypeKind,
        type_ids: &[i64],
    ) -> StoreResult<HashMap<i64, Vec<TypeDef>>> {
        if type_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let select = Query::select()
            .from(LinealParentTypes::Table)
            .columns([LinealParentTypes::TypeId, LinealParentTypes::ParentTypeId])
            .and_where(Expr::col(LinealParentTypes::TypeId).is_in(type_ids.iter().copied()))
            .to_owned();
        let mut links: Vec<(i64, i64)> = Vec::new();
        for row in self.query_all(&select).await? {
            let child: i64 = row
                .try_get("", &col_name(LinealParentTypes::TypeId))
                .map_err(|err| StoreError::internal(err.to_string()))?;
            let parent: i64 = row
                .try_get("", &col_name(LinealParentTypes::ParentTypeId))
                .map_err(|err| StoreError::internal(err.to_string()))?;
            links.push((child, parent));
        }
        let parent_ids: Vec<i64> = links.iter().map(|(_, parent)| *parent).collect();
        let parent_types = self.find_types_by_ids(kind, &parent_ids).await?;
        let parents_by_id: HashMap<i64, TypeDef> = parent_types
            .into_iter()
            .filter_map(|type_def| type_def.id.map(|id| (id, type_def)))
            .collect();
        let mut result: HashMap<i64, Vec<TypeDef>> = HashMap::new();
        for (child, parent) in links {
            if let Some(parent_type) = parents_by_id.get(&parent) {
                result.entry(child).or_default().push(parent_type.clone());
            }
        }
        Ok(result)
    }

    async fn create_artifact(&self, artifact: &Artifact) -> StoreResult<i64> {
        let type_def = self.entity_type(TypeKind::Artifact, artifact.type_id).await?;
        validate_property_map(&type_def, &artifact.properties)?;
        let now = now_millis();
        let insert = Query::insert()
            .into_table(LinealArtifacts::Table)
            .columns([
                LinealArtifacts::TypeId,
                LinealArtifacts::Uri,
                LinealArtifacts::Name,
                LinealArtifacts::State,
                LinealArtifacts::PropertiesJson,
                LinealArtifacts::CustomPropertiesJson,
                LinealArtifacts::CreateTimeSinceEpoch,
                LinealArtifacts::LastUpdateTimeSinceEpoch,
            ])
            .values_panic([
                type_def.id.unwrap_or_default().into(),
                artifact.uri.clone().into(),
                artifact.name.clone().into(),
                artifact.state.map(artifact_state_to_i16).into(),
                to_json_column(&artifact.properties)?.into(),
                to_json_column(&artifact.custom_properties)?.into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        self.insert_returning_id(insert, LinealArtifacts::Id).await
    }

    async fn update_artifact(&self, artifact: &Artifact) -> StoreResult<()> {
        let id = artifact
            .id
            .ok_or_else(|| StoreError::invalid_argument("artifact id must be set for update"))?;
        let stored = self
            .find_artifacts_by_ids(&[id])
            .await?
            .pop()
            .ok_or_else(|| StoreError::not_found(format!("no artifact with id {id}")))?;
        if artifact.type_id.is_some() && artifact.type_id != stored.type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored artifact cannot change",
            ));
        }
        let type_def = self.entity_type(TypeKind::Artifact, stored.type_id).await?;
        validate_property_map(&type_def, &artifact.properties)?;
        let update = Query::update()
            .table(LinealArtifacts::Table)
            .values([
                (LinealArtifacts::Uri, artifact.uri.clone().into()),
                (LinealArtifacts::Name, artifact.name.clone().into()),
                (
                    LinealArtifacts::State,
                    artifact.state.map(artifact_state_to_i16).into(),
                ),
                (
                    LinealArtifacts::PropertiesJson,
                    to_json_column(&artifact.properties)?.into(),
                ),
                (
                    LinealArtifacts::CustomPropertiesJson,
                    to_json_column(&artifact.custom_properties)?.into(),
                ),
                (
                    LinealArtifacts::LastUpdateTimeSinceEpoch,
                    now_millis().into(),
                ),
            ])
            .and_where(Expr::col(LinealArtifacts::Id).eq(id))
            .to_owned();
        self.exec(&update).await?;
        Ok(())
    }

    async fn find_artifacts_by_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Artifact>> {
        if artifact_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_artifacts()
            .and_where(Expr::col(LinealArtifacts::Id).is_in(artifact_ids.iter().copied()))
            .to_owned();
        let mut by_id = HashMap::new();
        for row in self.query_all(&select).await? {
            let artifact = artifact_from_row(&row)?;
            if let Some(id) = artifact.id {
                by_id.insert(id, artifact);
            }
        }
        artifact_ids
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no artifact with id {id}")))
            })
            .collect()
    }

    async fn find_artifacts(&self) -> StoreResult<Vec<Artifact>> {
        let select = select_artifacts()
            .order_by(LinealArtifacts::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(artifact_from_row)
            .collect()
    }

    async fn list_artifacts(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Artifact>> {
        self.list_rows(
            select_artifacts(),
            Some(options),
            artifact_columns(),
            artifact_from_row,
        )
        .await
    }

    async fn find_artifacts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>> {
        let select = select_artifacts()
            .and_where(Expr::col(LinealArtifacts::TypeId).eq(type_id))
            .to_owned();
        self.list_rows(select, options, artifact_columns(), artifact_from_row)
            .await
    }

    async fn find_artifact_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Artifact> {
        let select = select_artifacts()
            .and_where(Expr::col(LinealArtifacts::TypeId).eq(type_id))
            .and_where(Expr::col(LinealArtifacts::Name).eq(name))
            .to_owned();
        match self.query_one(&select).await? {
            Some(row) => artifact_from_row(&row),
            None => Err(StoreError::not_found(format!(
                "no artifact named `{name}` for type {type_id}"
            ))),
        }
    }

    async fn find_artifacts_by_uri(&self, uri: &str) -> StoreResult<Vec<Artifact>> {
        let select = select_artifacts()
            .and_where(Expr::col(LinealArtifacts::Uri).eq(uri))
            .order_by(LinealArtifacts::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(artifact_from_row)
            .collect()
    }

    async fn create_execution(&self, execution: &Execution) -> StoreResult<i64> {
        let type_def = self
            .entity_type(TypeKind::Execution, execution.type_id)
            .await?;
        validate_property_map(&type_def, &execution.properties)?;
        let now = now_millis();
        let insert = Query::insert()
            .into_table(LinealExecutions::Table)
            .columns([
                LinealExecutions::TypeId,
                LinealExecutions::Name,
                LinealExecutions::LastKnownState,
                LinealExecutions::PropertiesJson,
                LinealExecutions::CustomPropertiesJson,
                LinealExecutions::CreateTimeSinceEpoch,
                LinealExecutions::LastUpdateTimeSinceEpoch,
            ])
            .values_panic([
                type_def.id.unwrap_or_default().into(),
                execution.name.clone().into(),
                execution.last_known_state.map(execution_state_to_i16).into(),
                to_json_column(&execution.properties)?.into(),
                to_json_column(&execution.custom_properties)?.into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        self.insert_returning_id(insert, LinealExecutions::Id).await
    }

    async fn update_execution(&self, execution: &Execution) -> StoreResult<()> {
        let id = execution
            .id
            .ok_or_else(|| StoreError::invalid_argument("execution id must be set for update"))?;
        let stored = self
            .find_executions_by_ids(&[id])
            .await?
            .pop()
            .ok_or_else(|| StoreError::not_found(format!("no execution with id {id}")))?;
        if execution.type_id.is_some() && execution.type_id != stored.type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored execution cannot change",
            ));
        }
        let type_def = self
            .entity_type(TypeKind::Execution, stored.type_id)
            .await?;
        validate_property_map(&type_def, &execution.properties)?;
        let update = Query::update()
            .table(LinealExecutions::Table)
            .values([
                (LinealExecutions::Name, execution.name.clone().into()),
                (
                    LinealExecutions::LastKnownState,
                    execution.last_known_state.map(execution_state_to_i16).into(),
                ),
                (
                    LinealExecutions::PropertiesJson,
                    to_json_column(&execution.properties)?.into(),
                ),
                (
                    LinealExecutions::CustomPropertiesJson,
                    to_json_column(&execution.custom_properties)?.into(),
                ),
                (
                    LinealExecutions::LastUpdateTimeSinceEpoch,
                    now_millis().into(),
                ),
            ])
            .and_where(Expr::col(LinealExecutions::Id).eq(id))
            .to_owned();
        self.exec(&update).await?;
        Ok(())
    }

    async fn find_executions_by_ids(&self, execution_ids: &[i64]) -> StoreResult<Vec<Execution>> {
        if execution_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_executions()
            .and_where(Expr::col(LinealExecutions::Id).is_in(execution_ids.iter().copied()))
            .to_owned();
        let mut by_id = HashMap::new();
        for row in self.query_all(&select).await? {
            let execution = execution_from_row(&row)?;
            if let Some(id) = execution.id {
                by_id.insert(id, execution);
            }
        }
        execution_ids
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no execution with id {id}")))
            })
            .collect()
    }

    async fn find_executions(&self) -> StoreResult<Vec<Execution>> {
        let select = select_executions()
            .order_by(LinealExecutions::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(execution_from_row)
            .collect()
    }

    async fn list_executions(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Execution>> {
        self.list_rows(
            select_executions(),
            Some(options),
            execution_columns(),
            execution_from_row,
        )
        .await
    }

    async fn find_executions_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>> {
        let select = select_executions()
            .and_where(Expr::col(LinealExecutions::TypeId).eq(type_id))
            .to_owned();
        self.list_rows(select, options, execution_columns(), execution_from_row)
            .await
    }

    async fn find_execution_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Execution> {
        let select = select_executions()
            .and_where(Expr::col(LinealExecutions::TypeId).eq(type_id))
            .and_where(Expr::col(LinealExecutions::Name).eq(name))
            .to_owned();
        match self.query_one(&select).await? {
            Some(row) => execution_from_row(&row),
            None => Err(StoreError::not_found(format!(
                "no execution named `{name}` for type {type_id}"
            ))),
        }
    }

    async fn create_context(&self, context: &Context) -> StoreResult<i64> {
        if context.name.is_empty() {
            return Err(StoreError::invalid_argument("context name must be set"));
        }
        let type_def = self.entity_type(TypeKind::Context, context.type_id).await?;
        validate_property_map(&type_def, &context.properties)?;
        let now = now_millis();
        let insert = Query::insert()
            .into_table(LinealContexts::Table)
            .columns([
                LinealContexts::TypeId,
                LinealContexts::Name,
                LinealContexts::PropertiesJson,
                LinealContexts::CustomPropertiesJson,
                LinealContexts::CreateTimeSinceEpoch,
                LinealContexts::LastUpdateTimeSinceEpoch,
            ])
            .values_panic([
                type_def.id.unwrap_or_default().into(),
                context.name.clone().into(),
                to_json_column(&context.properties)?.into(),
                to_json_column(&context.custom_properties)?.into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        self.insert_returning_id(insert, LinealContexts::Id).await
    }

    async fn update_context(&self, context: &Context) -> StoreResult<()> {
        let id = context
            .id
            .ok_or_else(|| StoreError::invalid_argument("context id must be set for update"))?;
        if context.name.is_empty() {
            return Err(StoreError::invalid_argument("context name must be set"));
        }
        let stored = self
            .find_contexts_by_ids(&[id])
            .await?
            .pop()
            .ok_or_else(|| StoreError::not_found(format!("no context with id {id}")))?;
        if context.type_id.is_some() && context.type_id != stored.type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored context cannot change",
            ));
        }
        let type_def = self.entity_type(TypeKind::Context, stored.type_id).await?;
        validate_property_map(&type_def, &context.properties)?;
        let update = Query::update()
            .table(LinealContexts::Table)
            .values([
                (LinealContexts::Name, context.name.clone().into()),
                (
                    LinealContexts::PropertiesJson,
                    to_json_column(&context.properties)?.into(),
                ),
                (
                    LinealContexts::CustomPropertiesJson,
                    to_json_column(&context.custom_properties)?.into(),
                ),
                (
                    LinealContexts::LastUpdateTimeSinceEpoch,
                    now_millis().into(),
                ),
            ])
            .and_where(Expr::col(LinealContexts::Id).eq(id))
            .to_owned();
        self.exec(&update).await?;
        Ok(())
    }

    async fn find_contexts_by_ids(&self, context_ids: &[i64]) -> StoreResult<Vec<Context>> {
        if context_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_contexts()
            .and_where(Expr::col(LinealContexts::Id).is_in(context_ids.iter().copied()))
            .to_owned();
        let mut by_id = HashMap::new();
        for row in self.query_all(&select).await? {
            let context = context_from_row(&row)?;
            if let Some(id) = context.id {
                by_id.insert(id, context);
            }
        }
        context_ids
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no context with id {id}")))
            })
            .collect()
    }

    async fn find_contexts(&self) -> StoreResult<Vec<Context>> {
        let select = select_contexts()
            .order_by(LinealContexts::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(context_from_row)
            .collect()
    }

    async fn list_contexts(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Context>> {
        self.list_rows(
            select_contexts(),
            Some(options),
            context_columns(),
            context_from_row,
        )
        .await
    }

    async fn find_contexts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Context>> {
        let select = select_contexts()
            .and_where(Expr::col(LinealContexts::TypeId).eq(type_id))
            .to_owned();
        self.list_rows(select, options, context_columns(), context_from_row)
            .await
    }

    async fn find_context_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Context> {
        let select = select_contexts()
            .and_where(Expr::col(LinealContexts::TypeId).eq(type_id))
            .and_where(Expr::col(LinealContexts::Name).eq(name))
            .to_owned();
        match self.query_one(&select).await? {
            Some(row) => context_from_row(&row),
            None => Err(StoreError::not_found(format!(
                "no context named `{name}` for type {type_id}"
            ))),
        }
    }

    async fn create_event(&self, event: &Event) -> StoreResult<i64> {
        let artifact_id = event
            .artifact_id
            .ok_or_else(|| StoreError::invalid_argument("event artifact_id must be set"))?;
        let execution_id = event
            .execution_id
            .ok_or_else(|| StoreError::invalid_argument("event execution_id must be set"))?;
        if !self.artifact_exists(artifact_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "event references unknown artifact {artifact_id}"
            )));
        }
        if !self.execution_exists(execution_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "event references unknown execution {execution_id}"
            )));
        }
        let insert = Query::insert()
            .into_table(LinealEvents::Table)
            .columns([
                LinealEvents::ArtifactId,
                LinealEvents::ExecutionId,
                LinealEvents::EventType,
                LinealEvents::PathJson,
                LinealEvents::MillisecondsSinceEpoch,
            ])
            .values_panic([
                artifact_id.into(),
                execution_id.into(),
                event_type_to_i16(event.event_type).into(),
                to_json_column(&event.path)?.into(),
                event.milliseconds_since_epoch.into(),
            ])
            .to_owned();
        self.insert_returning_id(insert, LinealEvents::Id).await
    }

    async fn find_events_by_artifact_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Event>> {
        if artifact_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_events()
            .and_where(Expr::col(LinealEvents::ArtifactId).is_in(artifact_ids.iter().copied()))
            .order_by(LinealEvents::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(event_from_row)
            .collect()
    }

    async fn find_events_by_execution_ids(
        &self,
        execution_ids: &[i64],
    ) -> StoreResult<Vec<Event>> {
        if execution_ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = select_events()
            .and_where(Expr::col(LinealEvents::ExecutionId).is_in(execution_ids.iter().copied()))
            .order_by(LinealEvents::Id, Order::Asc)
            .to_owned();
        self.query_all(&select)
            .await?
            .iter()
            .map(event_from_row)
            .collect()
    }

    async fn create_association(&self, association: &Association) -> StoreResult<i64> {
        if !self.context_exists(association.context_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "association references unknown context {}",
                association.context_id
            )));
        }
        if !self.execution_exists(association.execution_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "association references unknown execution {}",
                association.execution_id
            )));
        }
        let insert = Query::insert()
            .into_table(LinealAssociations::Table)
            .columns([LinealAssociations::ContextId, LinealAssociations::ExecutionId])
            .values_panic([association.context_id.into(), association.execution_id.into()])
            .to_owned();
        self.insert_returning_id(insert, LinealAssociations::Id).await
    }

    async fn create_attribution(&self, attribution: &Attribution) -> StoreResult<i64> {
        if !self.context_exists(attribution.context_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "attribution references unknown context {}",
                attribution.context_id
            )));
        }
        if !self.artifact_exists(attribution.artifact_id).await? {
            return Err(StoreError::invalid_argument(format!(
                "attribution references unknown artifact {}",
                attribution.artifact_id
            )));
        }
        let insert = Query::insert()
            .into_table(LinealAttributions::Table)
            .columns([LinealAttributions::ContextId, LinealAttributions::ArtifactId])
            .values_panic([attribution.context_id.into(), attribution.artifact_id.into()])
            .to_owned();
        self.insert_returning_id(insert, LinealAttributions::Id).await
    }

    async fn find_contexts_by_artifact(&self, artifact_id: i64) -> StoreResult<Vec<Context>> {
        let select = Query::select()
            .from(LinealAttributions::Table)
            .column(LinealAttributions::ContextId)
            .and_where(Expr::col(LinealAttributions::ArtifactId).eq(artifact_id))
            .to_owned();
        let mut context_ids = Vec::new();
        for row in self.query_all(&select).await? {
            context_ids.push(
                row.try_get::<i64>("", &col_name(LinealAttributions::ContextId))
                    .map_err(|err| StoreError::internal(err.to_string()))?,
            );
        }
        match self.find_contexts_by_ids(&context_ids).await {
            Ok(contexts) => Ok(contexts),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn find_contexts_by_execution(&self, execution_id: i64) -> StoreResult<Vec<Context>> {
        let select = Query::select()
            .from(LinealAssociations::Table)
            .column(LinealAssociations::ContextId)
            .and_where(Expr::col(LinealAssociations::ExecutionId).eq(execution_id))
            .to_owned();
        let mut context_ids = Vec::new();
        for row in self.query_all(&select).await? {
            context_ids.push(
                row.try_get::<i64>("", &col_name(LinealAssociations::ContextId))
                    .map_err(|err| StoreError::internal(err.to_string()))?,
            );
        }
        match self.find_contexts_by_ids(&context_ids).await {
            Ok(contexts) => Ok(contexts),
            Err(err) if err.is_not_found() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    async fn find_artifacts_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>> {
        let linked = Query::select()
            .from(LinealAttributions::Table)
            .column(LinealAttributions::ArtifactId)
            .and_where(Expr::col(LinealAttributions::ContextId).eq(context_id))
            .to_owned();
        let select = select_artifacts()
            .and_where(Expr::col(LinealArtifacts::Id).in_subquery(linked))
            .to_owned();
        self.list_rows(select, options, artifact_columns(), artifact_from_row)
            .await
    }

    async fn find_executions_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>> {
        let linked = Query::select()
            .from(LinealAssociations::Table)
            .column(LinealAssociations::ExecutionId)
            .and_where(Expr::col(LinealAssociations::ContextId).eq(context_id))
            .to_owned();
        let select = select_executions()
            .and_where(Expr::col(LinealExecutions::Id).in_subquery(linked))
            .to_owned();
        self.list_rows(select, options, execution_columns(), execution_from_row)
            .await
    }

    async fn create_parent_context(&self, parent_context: &ParentContext) -> StoreResult<()> {
        if parent_context.child_id == parent_context.parent_id {
            return Err(StoreError::invalid_argument(
                "a context cannot be its own parent",
            ));
        }
        for context_id in [parent_context.child_id, parent_context.parent_id] {
            if !self.context_exists(context_id).await? {
                return Err(StoreError::invalid_argument(format!(
                    "parent context link references unknown context {context_id}"
                )));
            }
        }
        let insert = Query::insert()
            .into_table(LinealParentContexts::Table)
            .columns([
                LinealParentContexts::ContextId,
                LinealParentContexts::ParentContextId,
            ])
            .values_panic([
                parent_context.child_id.into(),
                parent_context.parent_id.into(),
            ])
            .to_owned();
        self.exec(&insert).await?;
        Ok(())
    }

    async fn find_parent_contexts_by_context_id(
        &self,
        context_id: i64,
    ) -> StoreResult<Vec<Context>> {
        let select = Query::select()
            .from(LinealParentContexts::Table)
            .column(LinealParentContexts::ParentContextId)
            .and_where(Expr::col(LinealParentContexts::ContextId).eq(context_id))
            .to_owned();
        let mut parent_ids = Vec::new();
        for row in self.query_all(&select).await? {
            parent_ids.push(
                row.try_get::<i64>("", &col_name(LinealParentContexts::ParentContextId))
                    .map_err(|err| StoreError::internal(err.to_string()))?,
            );
        }
        self.find_contexts_by_ids(&parent_ids).await
    }

    async fn find_child_contexts_by_context_id(
        &self,
        context_id: i64,
    ) -> StoreResult<Vec<Context>> {
        let select = Query::select()
            .from(LinealParentContexts::Table)
            .column(LinealParentContexts::ContextId)
            .and_where(Expr::col(LinealParentContexts::ParentContextId).eq(context_id))
            .to_owned();
        let mut child_ids = Vec::new();
        for row in self.query_all(&select).await? {
            child_ids.push(
                row.try_get::<i64>("", &col_name(LinealParentContexts::ContextId))
                    .map_err(|err| StoreError::internal(err.to_string()))?,
            );
        }
        self.find_contexts_by_ids(&child_ids).await
    }

    async fn query_lineage_graph(
        &self,
        seed_artifacts: &[Artifact],
        max_num_hops: i64,
        max_node_size: Option<i64>,
        boundary_artifacts: Option<&str>,
        boundary_executions: Option<&str>,
    ) -> StoreResult<LineageGraph> {
        if boundary_artifacts.is_some() || boundary_executions.is_some() {
            return Err(StoreError::unimplemented(
                "boundary conditions are not supported by this backend",
            ));
        }
        let node_budget = max_node_size
            .map(|size| size as usize)
            .unwrap_or(usize::MAX);
        let mut artifact_ids: BTreeSet<i64> = BTreeSet::new();
        for artifact in seed_artifacts {
            if artifact_ids.len() >= node_budget {
                break;
            }
            artifact_ids.extend(artifact.id);
        }
        let mut execution_ids: BTreeSet<i64> = BTreeSet::new();
        let mut frontier: Vec<i64> = artifact_ids.iter().copied().collect();
        let mut frontier_is_artifacts = true;
        for _ in 0..max_num_hops {
            if frontier.is_empty() || artifact_ids.len() + execution_ids.len() >= node_budget {
                break;
            }
            // The near side of the frontier is fixed for this hop; only the
            // far side grows, so its length alone tracks the node budget.
            let near_side_len = if frontier_is_artifacts {
                artifact_ids.len()
            } else {
                execution_ids.len()
            };
            let events = if frontier_is_artifacts {
                self.find_events_by_artifact_ids(&frontier).await?
            } else {
                self.find_events_by_execution_ids(&frontier).await?
            };
            let visited: &mut BTreeSet<i64> = if frontier_is_artifacts {
                &mut execution_ids
            } else {
                &mut artifact_ids
            };
            let mut discovered: BTreeSet<i64> = BTreeSet::new();
            for event in &events {
                let far_end = if frontier_is_artifacts {
                    event.execution_id
                } else {
                    event.artifact_id
                };
                if let Some(far_end) = far_end {
                    if !visited.contains(&far_end) {
                        discovered.insert(far_end);
                    }
                }
            }
            let mut admitted = Vec::new();
            for node in discovered {
                if near_side_len + visited.len() >= node_budget {
                    break;
                }
                visited.insert(node);
                admitted.push(node);
            }
            frontier = admitted;
            frontier_is_artifacts = !frontier_is_artifacts;
        }
        let artifact_id_list: Vec<i64> = artifact_ids.iter().copied().collect();
        let execution_id_list: Vec<i64> = execution_ids.iter().copied().collect();
        let artifacts = self.find_artifacts_by_ids(&artifact_id_list).await?;
        let executions = self.find_executions_by_ids(&execution_id_list).await?;
        let events: Vec<Event> = self
            .find_events_by_artifact_ids(&artifact_id_list)
            .await?
            .into_iter()
            .filter(|event| {
                event
                    .execution_id
                    .is_some_and(|id| execution_ids.contains(&id))
            })
            .collect();
        let artifact_type_ids: Vec<i64> = artifacts
            .iter()
            .filter_map(|artifact| artifact.type_id)
            .collect::<HashSet<i64>>()
            .into_iter()
            .collect();
        let execution_type_ids: Vec<i64> = executions
            .iter()
            .filter_map(|execution| execution.type_id)
            .collect::<HashSet<i64>>()
            .into_iter()
            .collect();
        Ok(LineageGraph {
            artifact_types: self
                .find_types_by_ids(TypeKind::Artifact, &artifact_type_ids)
                .await?,
            execution_types: self
                .find_types_by_ids(TypeKind::Execution, &execution_type_ids)
                .await?,
            context_types: Vec::new(),
            artifacts,
            executions,
            contexts: Vec::new(),
            events,
        })
    }

    async fn init_metadata_source(&self) -> StoreResult<()> {
        info!("initializing metadata schema from scratch");
        with_conn!(self, conn => Migrator::fresh(conn).await).map_err(map_db_err)
    }

    async fn init_metadata_source_if_not_exists(
        &self,
        enable_upgrade_migration: bool,
    ) -> StoreResult<()> {
        with_conn!(self, conn => {
            Migrator::install(conn).await.map_err(map_db_err)?;
            let pending = Migrator::get_pending_migrations(conn)
                .await
                .map_err(map_db_err)?;
            if pending.is_empty() {
                return Ok(());
            }
            let applied = Migrator::get_applied_migrations(conn)
                .await
                .map_err(map_db_err)?;
            if !applied.is_empty() && !enable_upgrade_migration {
                return Err(StoreError::failed_precondition(
                    "the schema is behind this library version; pass enable_upgrade_migration \
                     to upgrade it",
                ));
            }
            info!("applying {} pending schema migrations", pending.len());
            Migrator::up(conn, None).await.map_err(map_db_err)
        })
    }

    async fn downgrade_schema(&self, version: i64) -> StoreResult<()> {
        if version < 0 {
            return Err(StoreError::invalid_argument(format!(
                "downgrade version cannot be negative: {version}"
            )));
        }
        with_conn!(self, conn => {
            Migrator::install(conn).await.map_err(map_db_err)?;
            let applied = Migrator::get_applied_migrations(conn)
                .await
                .map_err(map_db_err)?
                .len() as i64;
            if version > applied {
                return Err(StoreError::invalid_argument(format!(
                    "cannot downgrade to schema version {version}: the database is at {applied}"
                )));
            }
            let steps = applied - version;
            if steps > 0 {
                warn!("downgrading metadata schema from version {applied} to {version}");
                Migrator::down(conn, Some(steps as u32))
                    .await
                    .map_err(map_db_err)?;
            }
            Ok(())
        })
    }
}
