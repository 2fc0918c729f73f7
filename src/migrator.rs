use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240501_000001_create_catalog_tables::Migration),
            Box::new(m20240501_000002_create_checkout_tables::Migration),
        ]
    }
}

mod m20240501_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MerchantAccounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MerchantAccounts::SiteKey)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(MerchantAccounts::SubAccountId).string().null())
                        .col(
                            ColumnDef::new(MerchantAccounts::OnboardingCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(MerchantAccounts::SalesSuspended)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductOfferings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ProductOfferings::SiteKey).string().not_null())
                        .col(ColumnDef::new(ProductOfferings::Id).string().not_null())
                        .col(
                            ColumnDef::new(ProductOfferings::Title)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(ProductOfferings::Body)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(ProductOfferings::Translations).json().not_null())
                        .col(ColumnDef::new(ProductOfferings::SourceLanguage).string().null())
                        .col(
                            ColumnDef::new(ProductOfferings::PriceTaxIncluded)
                                .big_integer()
                                .null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ProductOfferings::SiteKey)
                                .col(ProductOfferings::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShippingPriceTables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingPriceTables::DocId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ShippingPriceTables::Prices).json().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShippingPolicies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingPolicies::DocId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ShippingPolicies::Enabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ShippingPolicies::ThresholdByLanguage)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShippingPolicies::DefaultThreshold)
                                .big_integer()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShippingPolicies::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShippingPriceTables::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductOfferings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MerchantAccounts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MerchantAccounts {
        Table,
        SiteKey,
        SubAccountId,
        OnboardingCompleted,
        SalesSuspended,
    }

    #[derive(DeriveIden)]
    enum ProductOfferings {
        Table,
        SiteKey,
        Id,
        Title,
        Body,
        Translations,
        SourceLanguage,
        PriceTaxIncluded,
    }

    #[derive(DeriveIden)]
    enum ShippingPriceTables {
        Table,
        DocId,
        Prices,
    }

    #[derive(DeriveIden)]
    enum ShippingPolicies {
        Table,
        DocId,
        Enabled,
        ThresholdByLanguage,
        DefaultThreshold,
    }
}

mod m20240501_000002_create_checkout_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000002_create_checkout_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PendingCheckouts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PendingCheckouts::SessionId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PendingCheckouts::SiteKey).string().not_null())
                        .col(ColumnDef::new(PendingCheckouts::Status).string().not_null())
                        .col(
                            ColumnDef::new(PendingCheckouts::SettlementStyle)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingCheckouts::CheckoutUrl).text().not_null())
                        .col(ColumnDef::new(PendingCheckouts::Items).json().not_null())
                        .col(
                            ColumnDef::new(PendingCheckouts::Subtotal)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::ShippingFee)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::GrandTotal)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::PlatformFee)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::FeeRate)
                                .decimal_len(10, 6)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingCheckouts::Currency).string().not_null())
                        .col(ColumnDef::new(PendingCheckouts::Locale).string().not_null())
                        .col(ColumnDef::new(PendingCheckouts::Language).string().not_null())
                        .col(ColumnDef::new(PendingCheckouts::UiLanguage).string().null())
                        .col(
                            ColumnDef::new(PendingCheckouts::SubAccountId)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::TransferGroup)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::FreeShipping)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::FreeShippingThreshold)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::FreeShippingByThreshold)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::IdempotencyKeyHash)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::RequestFingerprint)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingCheckouts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pending_checkouts_site_idempotency")
                        .table(PendingCheckouts::Table)
                        .col(PendingCheckouts::SiteKey)
                        .col(PendingCheckouts::IdempotencyKeyHash)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FinalizedOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinalizedOrders::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FinalizedOrders::SessionId).string().not_null())
                        .col(ColumnDef::new(FinalizedOrders::EventId).string().null())
                        .col(ColumnDef::new(FinalizedOrders::SiteKey).string().null())
                        .col(ColumnDef::new(FinalizedOrders::Status).string().not_null())
                        .col(ColumnDef::new(FinalizedOrders::Amount).big_integer().null())
                        .col(ColumnDef::new(FinalizedOrders::Currency).string().null())
                        .col(ColumnDef::new(FinalizedOrders::PaymentStatus).string().null())
                        .col(ColumnDef::new(FinalizedOrders::Customer).json().not_null())
                        .col(ColumnDef::new(FinalizedOrders::Items).json().not_null())
                        .col(ColumnDef::new(FinalizedOrders::TransferGroup).string().null())
                        .col(ColumnDef::new(FinalizedOrders::SubAccountId).string().null())
                        .col(
                            ColumnDef::new(FinalizedOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Not unique: duplicate deliveries may legitimately produce several rows
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_finalized_orders_session_id")
                        .table(FinalizedOrders::Table)
                        .col(FinalizedOrders::SessionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FinalizedOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PendingCheckouts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PendingCheckouts {
        Table,
        SessionId,
        SiteKey,
        Status,
        SettlementStyle,
        CheckoutUrl,
        Items,
        Subtotal,
        ShippingFee,
        GrandTotal,
        PlatformFee,
        FeeRate,
        Currency,
        Locale,
        Language,
        UiLanguage,
        SubAccountId,
        TransferGroup,
        FreeShipping,
        FreeShippingThreshold,
        FreeShippingByThreshold,
        IdempotencyKeyHash,
        RequestFingerprint,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FinalizedOrders {
        Table,
        Id,
        SessionId,
        EventId,
        SiteKey,
        Status,
        Amount,
        Currency,
        PaymentStatus,
        Customer,
        Items,
        TransferGroup,
        SubAccountId,
        CreatedAt,
    }
}
