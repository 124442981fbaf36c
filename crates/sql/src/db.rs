use sea_orm_migration::prelude::Iden;

#[derive(Iden, Clone, Copy)]
pub enum LinealTypes {
    Table,
    Id,
    Name,
    Version,
    TypeKind,
    Description,
    PropertiesJson,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealParentTypes {
    Table,
    TypeId,
    ParentTypeId,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealArtifacts {
    Table,
    Id,
    TypeId,
    Uri,
    Name,
    State,
    PropertiesJson,
    CustomPropertiesJson,
    CreateTimeSinceEpoch,
    LastUpdateTimeSinceEpoch,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealExecutions {
    Table,
    Id,
    TypeId,
    Name,
    LastKnownState,
    PropertiesJson,
    CustomPropertiesJson,
    CreateTimeSinceEpoch,
    LastUpdateTimeSinceEpoch,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealContexts {
    Table,
    Id,
    TypeId,
    Name,
    PropertiesJson,
    CustomPropertiesJson,
    CreateTimeSinceEpoch,
    LastUpdateTimeSinceEpoch,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealEvents {
    Table,
    Id,
    ArtifactId,
    ExecutionId,
    EventType,
    PathJson,
    MillisecondsSinceEpoch,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealAssociations {
    Table,
    Id,
    ContextId,
    ExecutionId,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealAttributions {
    Table,
    Id,
    ContextId,
    ArtifactId,
}

#[derive(Iden, Clone, Copy)]
pub enum LinealParentContexts {
    Table,
    ContextId,
    ParentContextId,
}
