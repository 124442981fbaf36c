//! Row and column conversions between the wire structs and the relational
//! layout. Property maps and event paths travel as JSON text columns.

use lineal_store::{
    Artifact, ArtifactState, Context, Event, EventStep, EventType, Execution, ExecutionState,
    OrderByField, PropertyMap, PropertySchema, StoreError, StoreResult, TypeDef,
};
use sea_orm::sea_query;
use sea_orm::QueryResult;

use crate::db::*;

pub(crate) fn col_name(column: impl sea_query::Iden) -> String {
    column.to_string()
}

// -- enum codes ------------------------------------------------------------

pub(crate) fn artifact_state_to_i16(state: ArtifactState) -> i16 {
    match state {
        ArtifactState::Unknown => 0,
        ArtifactState::Pending => 1,
        ArtifactState::Live => 2,
        ArtifactState::MarkedForDeletion => 3,
        ArtifactState::Deleted => 4,
        ArtifactState::Abandoned => 5,
        ArtifactState::Reference => 6,
    }
}

pub(crate) fn artifact_state_from_i16(value: i16) -> StoreResult<ArtifactState> {
    Ok(match value {
        0 => ArtifactState::Unknown,
        1 => ArtifactState::Pending,
        2 => ArtifactState::Live,
        3 => ArtifactState::MarkedForDeletion,
        4 => ArtifactState::Deleted,
        5 => ArtifactState::Abandoned,
        6 => ArtifactState::Reference,
        other => {
            return Err(StoreError::internal(format!(
                "unknown artifact state code {other}"
            )))
        }
    })
}

pub(crate) fn execution_state_to_i16(state: ExecutionState) -> i16 {
    match state {
        ExecutionState::Unknown => 0,
        ExecutionState::New => 1,
        ExecutionState::Running => 2,
        ExecutionState::Complete => 3,
        ExecutionState::Failed => 4,
        ExecutionState::Cached => 5,
        ExecutionState::Canceled => 6,
    }
}

pub(crate) fn execution_state_from_i16(value: i16) -> StoreResult<ExecutionState> {
    Ok(match value {
        0 => ExecutionState::Unknown,
        1 => ExecutionState::New,
        2 => ExecutionState::Running,
        3 => ExecutionState::Complete,
        4 => ExecutionState::Failed,
        5 => ExecutionState::Cached,
        6 => ExecutionState::Canceled,
        other => {
            return Err(StoreError::internal(format!(
                "unknown execution state code {other}"
            )))
        }
    })
}

pub(crate) fn event_type_to_i16(event_type: EventType) -> i16 {
    match event_type {
        EventType::Unknown => 0,
        EventType::DeclaredOutput => 1,
        EventType::DeclaredInput => 2,
        EventType::Input => 3,
        EventType::Output => 4,
        EventType::InternalInput => 5,
        EventType::InternalOutput => 6,
    }
}

pub(crate) fn event_type_from_i16(value: i16) -> StoreResult<EventType> {
    Ok(match value {
        0 => EventType::Unknown,
        1 => EventType::DeclaredOutput,
        2 => EventType::DeclaredInput,
        3 => EventType::Input,
        4 => EventType::Output,
        5 => EventType::InternalInput,
        6 => EventType::InternalOutput,
        other => {
            return Err(StoreError::internal(format!(
                "unknown event type code {other}"
            )))
        }
    })
}

// -- json columns ----------------------------------------------------------

pub(crate) fn to_json_column<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|err| StoreError::internal(err.to_string()))
}

pub(crate) fn properties_from_json(raw: &str) -> StoreResult<PropertyMap> {
    serde_json::from_str(raw).map_err(|err| StoreError::internal(err.to_string()))
}

pub(crate) fn schema_from_json(raw: &str) -> StoreResult<PropertySchema> {
    serde_json::from_str(raw).map_err(|err| StoreError::internal(err.to_string()))
}

pub(crate) fn path_from_json(raw: &str) -> StoreResult<Vec<EventStep>> {
    serde_json::from_str(raw).map_err(|err| StoreError::internal(err.to_string()))
}

// -- row readers -----------------------------------------------------------

fn get<T>(row: &QueryResult, column: impl sea_query::Iden) -> StoreResult<T>
where
    T: sea_orm::TryGetable,
{
    row.try_get::<T>("", &col_name(column))
        .map_err(|err| StoreError::internal(err.to_string()))
}

pub(crate) fn type_from_row(row: &QueryResult) -> StoreResult<TypeDef> {
    let version: String = get(row, LinealTypes::Version)?;
    Ok(TypeDef {
        id: Some(get::<i64>(row, LinealTypes::Id)?),
        name: get(row, LinealTypes::Name)?,
        version: (!version.is_empty()).then_some(version),
        description: get::<Option<String>>(row, LinealTypes::Description)?,
        properties: schema_from_json(&get::<String>(row, LinealTypes::PropertiesJson)?)?,
        base_type: None,
    })
}

pub(crate) fn artifact_from_row(row: &QueryResult) -> StoreResult<Artifact> {
    Ok(Artifact {
        id: Some(get::<i64>(row, LinealArtifacts::Id)?),
        type_id: Some(get::<i64>(row, LinealArtifacts::TypeId)?),
        uri: get::<Option<String>>(row, LinealArtifacts::Uri)?,
        name: get::<Option<String>>(row, LinealArtifacts::Name)?,
        state: get::<Option<i16>>(row, LinealArtifacts::State)?
            .map(artifact_state_from_i16)
            .transpose()?,
        properties: properties_from_json(&get::<String>(row, LinealArtifacts::PropertiesJson)?)?,
        custom_properties: properties_from_json(&get::<String>(
            row,
            LinealArtifacts::CustomPropertiesJson,
        )?)?,
        create_time_since_epoch: get(row, LinealArtifacts::CreateTimeSinceEpoch)?,
        last_update_time_since_epoch: get(row, LinealArtifacts::LastUpdateTimeSinceEpoch)?,
    })
}

pub(crate) fn execution_from_row(row: &QueryResult) -> StoreResult<Execution> {
    Ok(Execution {
        id: Some(get::<i64>(row, LinealExecutions::Id)?),
        type_id: Some(get::<i64>(row, LinealExecutions::TypeId)?),
        name: get::<Option<String>>(row, LinealExecutions::Name)?,
        last_known_state: get::<Option<i16>>(row, LinealExecutions::LastKnownState)?
            .map(execution_state_from_i16)
            .transpose()?,
        properties: properties_from_json(&get::<String>(row, LinealExecutions::PropertiesJson)?)?,
        custom_properties: properties_from_json(&get::<String>(
            row,
            LinealExecutions::CustomPropertiesJson,
        )?)?,
        create_time_since_epoch: get(row, LinealExecutions::CreateTimeSinceEpoch)?,
        last_update_time_since_epoch: get(row, LinealExecutions::LastUpdateTimeSinceEpoch)?,
    })
}

pub(crate) fn context_from_row(row: &QueryResult) -> StoreResult<Context> {
    Ok(Context {
        id: Some(get::<i64>(row, LinealContexts::Id)?),
        type_id: Some(get::<i64>(row, LinealContexts::TypeId)?),
        name: get(row, LinealContexts::Name)?,
        properties: properties_from_json(&get::<String>(row, LinealContexts::PropertiesJson)?)?,
        custom_properties: properties_from_json(&get::<String>(
            row,
            LinealContexts::CustomPropertiesJson,
        )?)?,
        create_time_since_epoch: get(row, LinealContexts::CreateTimeSinceEpoch)?,
        last_update_time_since_epoch: get(row, LinealContexts::LastUpdateTimeSinceEpoch)?,
    })
}

pub(crate) fn event_from_row(row: &QueryResult) -> StoreResult<Event> {
    Ok(Event {
        artifact_id: Some(get::<i64>(row, LinealEvents::ArtifactId)?),
        execution_id: Some(get::<i64>(row, LinealEvents::ExecutionId)?),
        event_type: event_type_from_i16(get::<i16>(row, LinealEvents::EventType)?)?,
        path: path_from_json(&get::<String>(row, LinealEvents::PathJson)?)?,
        milliseconds_since_epoch: get(row, LinealEvents::MillisecondsSinceEpoch)?,
    })
}

// -- listing keys ----------------------------------------------------------

pub(crate) trait PagedEntity {
    fn entity_id(&self) -> i64;
    fn order_key(&self, field: OrderByField) -> i64;
}

macro_rules! impl_paged_entity {
    ($entity:ident) => {
        impl PagedEntity for $entity {
            fn entity_id(&self) -> i64 {
                self.id.unwrap_or_default()
            }
            fn order_key(&self, field: OrderByField) -> i64 {
                match field {
                    OrderByField::Id => self.entity_id(),
                    OrderByField::CreateTime => self.create_time_since_epoch,
                    OrderByField::LastUpdateTime => self.last_update_time_since_epoch,
                }
            }
        }
    };
}

impl_paged_entity!(Artifact);
impl_paged_entity!(Execution);
impl_paged_entity!(Context);

#[cfg(test)]
mod tests {
    use super::*;
    use lineal_store::PropertyValue;

    #[test]
    fn property_maps_round_trip_through_json() {
        let mut properties = PropertyMap::new();
        properties.insert("step".into(), PropertyValue::Int(3));
        properties.insert("note".into(), PropertyValue::String("ok".into()));
        let raw = to_json_column(&properties).unwrap();
        assert_eq!(properties_from_json(&raw).unwrap(), properties);
    }

    #[test]
    fn event_paths_round_trip_through_json() {
        let path = vec![EventStep::Index(0), EventStep::Key("model".into())];
        let raw = to_json_column(&path).unwrap();
        assert_eq!(path_from_json(&raw).unwrap(), path);
    }

    #[test]
    fn unknown_state_codes_are_internal_errors() {
        assert!(artifact_state_from_i16(42).is_err());
        assert!(execution_state_from_i16(42).is_err());
        assert!(event_type_from_i16(42).is_err());
    }
}
