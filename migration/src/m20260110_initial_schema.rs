// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 数据库初始模式迁移
///
/// 创建账号、设备指纹、代理模板、任务和任务批次表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 应用数据库迁移
    ///
    /// # 参数
    ///
    /// * `manager` - 数据库模式管理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 迁移成功
    /// * `Err(DbErr)` - 迁移失败
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Create fingerprints table (no dependencies)
        manager
            .create_table(
                Table::create()
                    .table(Fingerprints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fingerprints::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Fingerprints::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Fingerprints::UserAgent).string().not_null())
                    .col(ColumnDef::new(Fingerprints::AppVersion).string().null())
                    .col(ColumnDef::new(Fingerprints::OsVersion).string().null())
                    .col(
                        ColumnDef::new(Fingerprints::ScreenResolution)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Fingerprints::Device).json().not_null())
                    .col(
                        ColumnDef::new(Fingerprints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Create accounts table (depends on fingerprints)
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Username).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::PasswordEncrypted)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Accounts::Seed2fa).string().null())
                    .col(
                        ColumnDef::new(Accounts::LoginMethod)
                            .string()
                            .not_null()
                            .default("password"),
                    )
                    .col(ColumnDef::new(Accounts::Proxy).string().null())
                    .col(ColumnDef::new(Accounts::FingerprintId).uuid().null())
                    .col(ColumnDef::new(Accounts::Session).json().null())
                    .col(
                        ColumnDef::new(Accounts::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(ColumnDef::new(Accounts::LastError).string().null())
                    .col(
                        ColumnDef::new(Accounts::IsChecker)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. Create proxy_templates table
        manager
            .create_table(
                Table::create()
                    .table(ProxyTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProxyTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProxyTemplates::TenantId).uuid().not_null())
                    .col(ColumnDef::new(ProxyTemplates::Name).string().not_null())
                    .col(ColumnDef::new(ProxyTemplates::ProxyUrl).string().not_null())
                    .col(ColumnDef::new(ProxyTemplates::Description).string().null())
                    .col(
                        ColumnDef::new(ProxyTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. Create task_batches table
        manager
            .create_table(
                Table::create()
                    .table(TaskBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskBatches::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskBatches::TenantId).uuid().not_null())
                    .col(ColumnDef::new(TaskBatches::TaskType).string().not_null())
                    .col(
                        ColumnDef::new(TaskBatches::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(TaskBatches::TotalCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TaskBatches::SuccessCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TaskBatches::FailedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(TaskBatches::Params).json().null())
                    .col(
                        ColumnDef::new(TaskBatches::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TaskBatches::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TaskBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 5. Create tasks table (depends on accounts and task_batches)
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Tasks::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Tasks::BatchId).uuid().null())
                    .col(ColumnDef::new(Tasks::TaskType).string().not_null())
                    .col(ColumnDef::new(Tasks::Params).json().not_null())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Tasks::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tasks::ExecutedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Tasks::Error).text().null())
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    /// 回滚数据库迁移
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskBatches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProxyTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Fingerprints::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Fingerprints {
    Table,
    Id,
    TenantId,
    UserAgent,
    AppVersion,
    OsVersion,
    ScreenResolution,
    Device,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    TenantId,
    Username,
    PasswordEncrypted,
    #[sea_orm(iden = "seed_2fa")]
    Seed2fa,
    LoginMethod,
    Proxy,
    FingerprintId,
    Session,
    Status,
    LastError,
    IsChecker,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProxyTemplates {
    Table,
    Id,
    TenantId,
    Name,
    ProxyUrl,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TaskBatches {
    Table,
    Id,
    TenantId,
    TaskType,
    Status,
    TotalCount,
    SuccessCount,
    FailedCount,
    Params,
    StartedAt,
    CompletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    TenantId,
    AccountId,
    BatchId,
    TaskType,
    Params,
    Status,
    ScheduledAt,
    ExecutedAt,
    Error,
    CreatedAt,
    UpdatedAt,
}
