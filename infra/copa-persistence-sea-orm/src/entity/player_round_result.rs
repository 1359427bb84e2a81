use sea_orm::entity::prelude::*;

/// One player's kills inside a round result. `(round_result_id, player_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "player_round_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub round_result_id: i64,
    #[sea_orm(indexed)]
    pub player_id: i64,
    pub kills: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::round_result::Entity",
        from = "Column::RoundResultId",
        to = "super::round_result::Column::Id",
        on_delete = "Cascade"
    )]
    RoundResult,
    #[sea_orm(
        belongs_to = "super::player::Entity",
        from = "Column::PlayerId",
        to = "super::player::Column::Id",
        on_delete = "Cascade"
    )]
    Player,
}

impl Related<super::round_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoundResult.def()
    }
}

impl Related<super::player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
