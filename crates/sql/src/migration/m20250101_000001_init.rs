use sea_orm_migration::prelude::*;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LinealTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealTypes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LinealTypes::Name).string().not_null())
                    // Unversioned types store the empty string so the unique
                    // index below actually dedupes them.
                    .col(
                        ColumnDef::new(LinealTypes::Version)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(LinealTypes::TypeKind)
                            .small_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinealTypes::Description).string())
                    .col(ColumnDef::new(LinealTypes::PropertiesJson).text().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_types_name_version_kind")
                    .table(LinealTypes::Table)
                    .col(LinealTypes::Name)
                    .col(LinealTypes::Version)
                    .col(LinealTypes::TypeKind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealParentTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealParentTypes::TypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealParentTypes::ParentTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_lineal_parent_types")
                            .col(LinealParentTypes::TypeId)
                            .col(LinealParentTypes::ParentTypeId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealArtifacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealArtifacts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealArtifacts::TypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinealArtifacts::Uri).string())
                    .col(ColumnDef::new(LinealArtifacts::Name).string())
                    .col(ColumnDef::new(LinealArtifacts::State).small_integer())
                    .col(
                        ColumnDef::new(LinealArtifacts::PropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealArtifacts::CustomPropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealArtifacts::CreateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealArtifacts::LastUpdateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_artifacts_type_name")
                    .table(LinealArtifacts::Table)
                    .col(LinealArtifacts::TypeId)
                    .col(LinealArtifacts::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_lineal_artifacts_uri")
                    .table(LinealArtifacts::Table)
                    .col(LinealArtifacts::Uri)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealExecutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealExecutions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealExecutions::TypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinealExecutions::Name).string())
                    .col(ColumnDef::new(LinealExecutions::LastKnownState).small_integer())
                    .col(
                        ColumnDef::new(LinealExecutions::PropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealExecutions::CustomPropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealExecutions::CreateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealExecutions::LastUpdateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_executions_type_name")
                    .table(LinealExecutions::Table)
                    .col(LinealExecutions::TypeId)
                    .col(LinealExecutions::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealContexts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealContexts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealContexts::TypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinealContexts::Name).string().not_null())
                    .col(
                        ColumnDef::new(LinealContexts::PropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealContexts::CustomPropertiesJson)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealContexts::CreateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealContexts::LastUpdateTimeSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_contexts_type_name")
                    .table(LinealContexts::Table)
                    .col(LinealContexts::TypeId)
                    .col(LinealContexts::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealEvents::ArtifactId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealEvents::ExecutionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealEvents::EventType)
                            .small_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LinealEvents::PathJson).text().not_null())
                    .col(
                        ColumnDef::new(LinealEvents::MillisecondsSinceEpoch)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_lineal_events_artifact")
                    .table(LinealEvents::Table)
                    .col(LinealEvents::ArtifactId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_lineal_events_execution")
                    .table(LinealEvents::Table)
                    .col(LinealEvents::ExecutionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealAssociations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealAssociations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealAssociations::ContextId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealAssociations::ExecutionId)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_associations_pair")
                    .table(LinealAssociations::Table)
                    .col(LinealAssociations::ContextId)
                    .col(LinealAssociations::ExecutionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealAttributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealAttributions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LinealAttributions::ContextId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealAttributions::ArtifactId)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uq_lineal_attributions_pair")
                    .table(LinealAttributions::Table)
                    .col(LinealAttributions::ContextId)
                    .col(LinealAttributions::ArtifactId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LinealParentContexts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LinealParentContexts::ContextId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LinealParentContexts::ParentContextId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_lineal_parent_contexts")
                            .col(LinealParentContexts::ContextId)
                            .col(LinealParentContexts::ParentContextId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(LinealParentContexts::Table).to_owned(),
            Table::drop().table(LinealAttributions::Table).to_owned(),
            Table::drop().table(LinealAssociations::Table).to_owned(),
            Table::drop().table(LinealEvents::Table).to_owned(),
            Table::drop().table(LinealContexts::Table).to_owned(),
            Table::drop().table(LinealExecutions::Table).to_owned(),
            Table::drop().table(LinealArtifacts::Table).to_owned(),
            Table::drop().table(LinealParentTypes::Table).to_owned(),
            Table::drop().table(LinealTypes::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}
