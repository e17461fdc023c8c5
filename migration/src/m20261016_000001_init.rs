use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== BASELINE (single row) ==========
        manager
            .create_table(
                Table::create()
                    .table(Baseline::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Baseline::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Baseline::Lux).double().not_null())
                    .col(ColumnDef::new(Baseline::AvgLdr).double().not_null().default(0.0))
                    .col(ColumnDef::new(Baseline::SolarCurrent).double().not_null())
                    .col(
                        ColumnDef::new(Baseline::SetAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Only id = 1 may exist
        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE baseline ADD CONSTRAINT baseline_singleton CHECK (id = 1)")
            .await?;

        // ========== READINGS ==========
        manager
            .create_table(
                Table::create()
                    .table(Readings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Readings::EntryId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Readings::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Readings::Lux).double().not_null())
                    .col(ColumnDef::new(Readings::HorizontalError).double().not_null())
                    .col(ColumnDef::new(Readings::VerticalError).double().not_null())
                    .col(ColumnDef::new(Readings::ServoX).double().not_null())
                    .col(ColumnDef::new(Readings::ServoY).double().not_null())
                    .col(ColumnDef::new(Readings::SolarVoltage).double().not_null())
                    .col(ColumnDef::new(Readings::SolarCurrent).double().not_null())
                    .col(ColumnDef::new(Readings::BatteryVoltage).double().not_null())
                    .col(ColumnDef::new(Readings::AvgLdr).double())
                    .col(ColumnDef::new(Readings::Status).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_readings_time")
                    .table(Readings::Table)
                    .col((Readings::Time, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Readings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Baseline::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Baseline {
    Table,
    Id,
    Lux,
    AvgLdr,
    SolarCurrent,
    SetAt,
}

#[derive(DeriveIden)]
pub enum Readings {
    Table,
    EntryId,
    Time,
    Lux,
    HorizontalError,
    VerticalError,
    ServoX,
    ServoY,
    SolarVoltage,
    SolarCurrent,
    BatteryVoltage,
    AvgLdr,
    Status,
}
