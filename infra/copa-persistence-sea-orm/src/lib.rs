use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
    sea_query::{Index, IndexCreateStatement},
};

use crate::entity::{player, player_round_result, round, round_result, team};

pub mod entity;
pub mod players;
pub mod rounds;
pub mod teams;

pub use players::PlayerRepositoryImpl;
pub use rounds::RoundRepositoryImpl;
pub use teams::TeamRepositoryImpl;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://copa.db?mode=rwc";

pub async fn create_db_pool(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(5).sqlx_logging(false);
    Database::connect(opt).await
}

/// `(round_id, team_id)` and `(round_result_id, player_id)` key the upserts.
fn unique_keys() -> [IndexCreateStatement; 2] {
    [
        Index::create()
            .name("round_results_round_team")
            .table(round_result::Entity)
            .col(round_result::Column::RoundId)
            .col(round_result::Column::TeamId)
            .unique()
            .to_owned(),
        Index::create()
            .name("player_round_results_result_player")
            .table(player_round_result::Entity)
            .col(player_round_result::Column::RoundResultId)
            .col(player_round_result::Column::PlayerId)
            .unique()
            .to_owned(),
    ]
}

/// Creates missing tables and indexes from the entities. Existing data is left untouched.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(team::Entity),
        schema.create_table_from_entity(player::Entity),
        schema.create_table_from_entity(round::Entity),
        schema.create_table_from_entity(round_result::Entity),
        schema.create_table_from_entity(player_round_result::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let indexes = schema
        .create_index_from_entity(player::Entity)
        .into_iter()
        .chain(schema.create_index_from_entity(round_result::Entity))
        .chain(schema.create_index_from_entity(player_round_result::Entity))
        .chain(unique_keys());
    for mut index in indexes {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

pub(crate) fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub(crate) fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
