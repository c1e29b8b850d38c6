// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Index for tasks: due-scan performance of the scheduler loop
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_status_scheduled_at")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .col(Tasks::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_batch_id")
                    .table(Tasks::Table)
                    .col(Tasks::BatchId)
                    .to_owned(),
            )
            .await?;

        // Index for accounts: proxy usage counting and tenant scoping
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_tenant_status")
                    .table(Accounts::Table)
                    .col(Accounts::TenantId)
                    .col(Accounts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_proxy")
                    .table(Accounts::Table)
                    .col(Accounts::Proxy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tasks_status_scheduled_at").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_tasks_batch_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_accounts_tenant_status").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_accounts_proxy").to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Status,
    ScheduledAt,
    BatchId,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    TenantId,
    Status,
    Proxy,
}
